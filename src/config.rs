//! Export job configuration
//!
//! This module contains the immutable configuration for a single export
//! run. A config is validated once at construction and never mutated
//! afterward.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// Salesforce Credentials
// ============================================================================

/// Credentials for the Salesforce OAuth2 username-password flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceCredentials {
    /// Login URL (production or sandbox)
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Connected-app consumer key
    pub client_id: String,

    /// Connected-app consumer secret
    pub client_secret: String,

    /// Salesforce username
    pub username: String,

    /// Salesforce password
    pub password: String,

    /// Security token, appended to the password during login.
    /// Empty when the org trusts the caller's IP range.
    #[serde(default)]
    pub security_token: String,
}

fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}

impl Default for SalesforceCredentials {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            security_token: String::new(),
        }
    }
}

// ============================================================================
// Codec and Coercion Selectors
// ============================================================================

/// Compression codec applied during Parquet encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression
    None,
    /// Snappy: fast, modest ratio
    #[default]
    Fast,
    /// Gzip: balanced speed and ratio
    Balanced,
    /// Zstd: best ratio
    Max,
}

/// Policy for fields whose primitive type conflicts across records
/// within a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoercionPolicy {
    /// Coerce conflicting values to their string representation (lossy)
    #[default]
    StringifyMixed,
    /// Fail the batch with an encoding error
    Strict,
}

// ============================================================================
// Export Job Config
// ============================================================================

/// Complete configuration for one export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJobConfig {
    /// Salesforce connection credentials
    pub credentials: SalesforceCredentials,

    /// Destination bucket URL (`s3://bucket`, `gs://bucket`,
    /// `az://container`, or a local path)
    pub bucket_url: String,

    /// Key prefix under the bucket
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// SObject types to export, in report order
    pub object_types: Vec<String>,

    /// Records per batch (one uploaded part per batch)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Parquet compression codec
    #[serde(default)]
    pub compression: CompressionCodec,

    /// Maximum object types exported concurrently
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Maximum upload retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Mixed-type field handling during encoding
    #[serde(default)]
    pub coercion: CoercionPolicy,
}

fn default_prefix() -> String {
    "salesforce-exports".to_string()
}

fn default_batch_size() -> usize {
    10_000
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ExportJobConfig {
    /// A skeleton carrying only the documented defaults; required
    /// fields start empty and fail [`ExportJobConfig::validate`]
    fn default() -> Self {
        Self {
            credentials: SalesforceCredentials::default(),
            bucket_url: String::new(),
            prefix: default_prefix(),
            object_types: Vec::new(),
            batch_size: default_batch_size(),
            compression: CompressionCodec::default(),
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            coercion: CoercionPolicy::default(),
        }
    }
}

impl ExportJobConfig {
    /// Load and validate a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Parse and validate a config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Called once at construction; a config that passes here is never
    /// mutated afterward.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.credentials.login_url)
            .map_err(|e| Error::config(format!("invalid login_url: {e}")))?;

        if self.credentials.username.is_empty() {
            return Err(Error::missing_field("username"));
        }
        if self.credentials.password.is_empty() {
            return Err(Error::missing_field("password"));
        }
        if self.credentials.client_id.is_empty() {
            return Err(Error::missing_field("client_id"));
        }
        if self.credentials.client_secret.is_empty() {
            return Err(Error::missing_field("client_secret"));
        }
        if self.bucket_url.is_empty() {
            return Err(Error::missing_field("bucket_url"));
        }

        if self.object_types.is_empty() {
            return Err(Error::config("at least one object type is required"));
        }
        let mut seen = HashSet::new();
        for object_type in &self.object_types {
            if object_type.is_empty() {
                return Err(Error::config("object type names must be non-empty"));
            }
            if !seen.insert(object_type.as_str()) {
                return Err(Error::config(format!(
                    "duplicate object type: {object_type}"
                )));
            }
        }

        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be positive"));
        }
        if self.max_concurrent == 0 {
            return Err(Error::config("max_concurrent must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ExportJobConfig {
        ExportJobConfig {
            credentials: SalesforceCredentials {
                login_url: default_login_url(),
                client_id: "client".to_string(),
                client_secret: "secret".to_string(),
                username: "user@example.com".to_string(),
                password: "hunter2".to_string(),
                security_token: "tok".to_string(),
            },
            bucket_url: "s3://exports".to_string(),
            prefix: default_prefix(),
            object_types: vec!["Account".to_string(), "Contact".to_string()],
            batch_size: 10_000,
            compression: CompressionCodec::Fast,
            max_concurrent: 4,
            max_retries: 3,
            coercion: CoercionPolicy::StringifyMixed,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_empty_object_types_rejected() {
        let mut config = test_config();
        config.object_types.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_object_types_rejected() {
        let mut config = test_config();
        config.object_types = vec!["Account".to_string(), "Account".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate object type"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = test_config();
        config.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = test_config();
        config.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let mut config = test_config();
        config.credentials.username.clear();
        assert!(matches!(
            config.validate(),
            Err(Error::MissingConfigField { .. })
        ));
    }

    #[test]
    fn test_from_json_defaults() {
        let json = r#"{
            "credentials": {
                "client_id": "client",
                "client_secret": "secret",
                "username": "user@example.com",
                "password": "hunter2"
            },
            "bucket_url": "s3://exports",
            "object_types": ["Account"]
        }"#;
        let config = ExportJobConfig::from_json(json).unwrap();
        assert_eq!(config.prefix, "salesforce-exports");
        assert_eq!(config.batch_size, 10_000);
        assert_eq!(config.compression, CompressionCodec::Fast);
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.coercion, CoercionPolicy::StringifyMixed);
        assert_eq!(
            config.credentials.login_url,
            "https://login.salesforce.com"
        );
    }

    #[test]
    fn test_codec_serde_names() {
        let codec: CompressionCodec = serde_json::from_str("\"balanced\"").unwrap();
        assert_eq!(codec, CompressionCodec::Balanced);
        let codec: CompressionCodec = serde_json::from_str("\"max\"").unwrap();
        assert_eq!(codec, CompressionCodec::Max);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = test_config();
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = ExportJobConfig::from_file(&path).unwrap();
        assert_eq!(loaded.object_types, config.object_types);
        assert_eq!(loaded.bucket_url, config.bucket_url);
    }
}
