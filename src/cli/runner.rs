//! CLI runner - builds the job config and drives the orchestrator

use crate::cli::commands::Cli;
use crate::config::ExportJobConfig;
use crate::error::{Error, Result};
use crate::export::ExportOrchestrator;
use std::fs;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the export; returns the process exit code
    pub async fn run(&self) -> Result<i32> {
        let config = self.build_config()?;
        let orchestrator = ExportOrchestrator::connect(config)?;

        // Ctrl-C drains in-flight uploads instead of killing the process
        let cancel = orchestrator.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight uploads");
                cancel.cancel();
            }
        });

        let report = orchestrator.run().await;

        for result in report.results() {
            if result.is_success() {
                println!(
                    "✓ {}: {} records in {} parts",
                    result.object_type(),
                    result.records_exported(),
                    result.parts_exported()
                );
            } else {
                println!(
                    "✗ {}: failed after {} records in {} parts",
                    result.object_type(),
                    result.records_exported(),
                    result.parts_exported()
                );
            }
        }
        info!(
            "Export finished: {} records, {} parts",
            report.total_records(),
            report.total_parts()
        );

        Ok(i32::from(report.has_failures()))
    }

    /// Merge the config file (if given) with flag and env overrides
    ///
    /// Flags win over the file; the merged config is validated once at
    /// the end, so a file missing a field a flag supplies is fine.
    fn build_config(&self) -> Result<ExportJobConfig> {
        let mut config = match &self.cli.config {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read {}: {e}", path.display()))
                })?;
                serde_json::from_str(&contents)
                    .map_err(|e| Error::config(format!("Invalid config JSON: {e}")))?
            }
            None => ExportJobConfig::default(),
        };

        if let Some(username) = &self.cli.username {
            config.credentials.username = username.clone();
        }
        if let Some(password) = &self.cli.password {
            config.credentials.password = password.clone();
        }
        if let Some(token) = &self.cli.security_token {
            config.credentials.security_token = token.clone();
        }
        if let Some(client_id) = &self.cli.client_id {
            config.credentials.client_id = client_id.clone();
        }
        if let Some(client_secret) = &self.cli.client_secret {
            config.credentials.client_secret = client_secret.clone();
        }
        if let Some(login_url) = &self.cli.login_url {
            config.credentials.login_url = login_url.clone();
        }
        if let Some(bucket) = &self.cli.bucket {
            config.bucket_url = bucket.clone();
        }
        if let Some(prefix) = &self.cli.prefix {
            config.prefix = prefix.clone();
        }
        if !self.cli.sobjects.is_empty() {
            config.object_types = self.cli.sobjects.clone();
        }
        if let Some(batch_size) = self.cli.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(compression) = self.cli.compression {
            config.compression = compression.into();
        }
        if let Some(max_concurrent) = self.cli.max_concurrent {
            config.max_concurrent = max_concurrent;
        }
        if let Some(max_retries) = self.cli.max_retries {
            config.max_retries = max_retries;
        }
        if self.cli.strict_types {
            config.coercion = self.cli.coercion();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoercionPolicy, CompressionCodec};
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("sf-export").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_build_a_full_config() {
        let runner = Runner::new(cli(&[
            "--username",
            "user@example.com",
            "--password",
            "hunter2",
            "--client-id",
            "client",
            "--client-secret",
            "secret",
            "--bucket",
            "s3://exports",
            "--sobject",
            "Account",
            "--sobject",
            "Contact",
            "--compression",
            "max",
            "--batch-size",
            "500",
            "--strict-types",
        ]));

        let config = runner.build_config().unwrap();
        assert_eq!(config.object_types, ["Account", "Contact"]);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.compression, CompressionCodec::Max);
        assert_eq!(config.coercion, CoercionPolicy::Strict);
        assert_eq!(config.prefix, "salesforce-exports");
        assert_eq!(config.max_concurrent, 4);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(
            &path,
            r#"{
                "credentials": {
                    "client_id": "client",
                    "client_secret": "secret",
                    "username": "user@example.com",
                    "password": "hunter2"
                },
                "bucket_url": "s3://from-file",
                "prefix": "file-prefix",
                "object_types": ["Account"]
            }"#,
        )
        .unwrap();

        let runner = Runner::new(cli(&[
            "--config",
            path.to_str().unwrap(),
            "--bucket",
            "gs://from-flag",
            "--sobject",
            "Lead",
        ]));

        let config = runner.build_config().unwrap();
        assert_eq!(config.bucket_url, "gs://from-flag");
        assert_eq!(config.prefix, "file-prefix");
        assert_eq!(config.object_types, ["Lead"]);
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let runner = Runner::new(cli(&["--bucket", "s3://exports", "--sobject", "Account"]));
        let err = runner.build_config().unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { .. }));
    }
}
