//! Command-line interface
//!
//! Parses flags and environment variables into an export job config,
//! runs the orchestrator, and prints a per-object summary.
//!
//! Credentials can come from a JSON config file (`-C`), flags, or the
//! `SF_*` environment variables; flags override the file.

mod commands;
mod runner;

pub use commands::{Cli, CompressionArg};
pub use runner::Runner;
