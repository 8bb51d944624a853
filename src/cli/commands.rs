//! CLI argument parsing

use crate::config::{CoercionPolicy, CompressionCodec};
use clap::Parser;
use std::path::PathBuf;

/// Export Salesforce objects to Parquet in an object store
#[derive(Parser, Debug)]
#[command(name = "sf-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Job configuration file (JSON); flags override file values
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Salesforce username
    #[arg(short, long, env = "SF_USERNAME")]
    pub username: Option<String>,

    /// Salesforce password
    #[arg(short, long, env = "SF_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Salesforce security token (appended to the password at login)
    #[arg(short = 't', long, env = "SF_SECURITY_TOKEN", hide_env_values = true)]
    pub security_token: Option<String>,

    /// Connected app consumer key
    #[arg(long, env = "SF_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Connected app consumer secret
    #[arg(long, env = "SF_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Salesforce login URL
    #[arg(long, env = "SF_LOGIN_URL")]
    pub login_url: Option<String>,

    /// Destination bucket URL (s3://bucket, gs://bucket, az://container,
    /// or a local directory)
    #[arg(short, long, env = "EXPORT_BUCKET")]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long, env = "EXPORT_PREFIX")]
    pub prefix: Option<String>,

    /// Object type to export (repeatable)
    #[arg(short = 's', long = "sobject")]
    pub sobjects: Vec<String>,

    /// Records per Parquet part file
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Parquet compression codec
    #[arg(long, value_enum)]
    pub compression: Option<CompressionArg>,

    /// Maximum object types exported concurrently
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Upload retries per part
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Fail on mixed column types instead of stringifying
    #[arg(long)]
    pub strict_types: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Compression codec choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CompressionArg {
    /// No compression
    None,
    /// Snappy (fast, moderate ratio)
    Fast,
    /// Gzip (balanced)
    Balanced,
    /// Zstd (best ratio)
    Max,
}

impl From<CompressionArg> for CompressionCodec {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => Self::None,
            CompressionArg::Fast => Self::Fast,
            CompressionArg::Balanced => Self::Balanced,
            CompressionArg::Max => Self::Max,
        }
    }
}

impl Cli {
    /// Coercion policy implied by the flags
    pub fn coercion(&self) -> CoercionPolicy {
        if self.strict_types {
            CoercionPolicy::Strict
        } else {
            CoercionPolicy::StringifyMixed
        }
    }
}
