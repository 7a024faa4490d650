//! Bridge configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::auth::SecretKey;

pub const DEFAULT_MAX_ALLOWED_SKEW_MS: i64 = 900_000;
pub const DEFAULT_BASE_SUBDOMAIN: &str = "s3";
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 1024;
pub const DEFAULT_DURABILITY: u32 = 2;
pub const S3_API_VERSION: &str = "2006-03-01";

/// Immutable gateway configuration. Shared via `Arc` after load.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Access key id expected in `Authorization` headers.
    pub access_key: String,

    /// Secret key used to recompute request signatures.
    pub secret_key: SecretKey,

    /// When false the authentication dispatcher is skipped entirely.
    pub auth_enabled: bool,

    /// Subdomain label that marks the base endpoint (e.g. `s3` in
    /// `s3.example.com`).
    pub base_subdomain: String,

    /// Maximum tolerated difference between request time and server time.
    pub max_allowed_skew_ms: i64,

    /// Backing-store directory that holds one subdirectory per bucket.
    pub bucket_path: String,

    /// Durability applied to uploads without a recognized storage class.
    pub default_durability: u32,

    pub max_filename_length: usize,

    /// Owner display name reported in listings and ACLs.
    pub display_name: String,

    /// Owner canonical id reported in listings and ACLs.
    pub owner_id: String,

    pub storage_class_mapping: BTreeMap<String, u32>,

    /// Keyed by durability rendered as a decimal string.
    pub durability_mapping: BTreeMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let storage_class_mapping = [("STANDARD", 2), ("STANDARD_IA", 2), ("REDUCED_REDUNDANCY", 1), ("GLACIER", 1)]
            .into_iter()
            .map(|(class, durability)| (class.to_owned(), durability))
            .collect();
        let durability_mapping = [("2", "STANDARD"), ("1", "REDUCED_REDUNDANCY")]
            .into_iter()
            .map(|(durability, class)| (durability.to_owned(), class.to_owned()))
            .collect();
        Self {
            access_key: String::new(),
            secret_key: SecretKey::default(),
            auth_enabled: true,
            base_subdomain: DEFAULT_BASE_SUBDOMAIN.to_owned(),
            max_allowed_skew_ms: DEFAULT_MAX_ALLOWED_SKEW_MS,
            bucket_path: "/buckets".to_owned(),
            default_durability: DEFAULT_DURABILITY,
            max_filename_length: DEFAULT_MAX_FILENAME_LENGTH,
            display_name: "s3-bridge".to_owned(),
            owner_id: "s3-bridge".to_owned(),
            storage_class_mapping,
            durability_mapping,
        }
    }
}

impl BridgeConfig {
    /// Maps an `x-amz-storage-class` value to a durability level.
    #[must_use]
    pub fn durability_for(&self, storage_class: Option<&str>) -> u32 {
        storage_class
            .and_then(|class| self.storage_class_mapping.get(class))
            .copied()
            .unwrap_or(self.default_durability)
    }

    /// Maps a durability level back to a storage class. Unknown levels
    /// report `STANDARD`.
    #[must_use]
    pub fn storage_class_for(&self, durability: Option<u32>) -> &str {
        durability
            .and_then(|level| self.durability_mapping.get(level.to_string().as_str()))
            .map_or("STANDARD", String::as_str)
    }

    /// Absolute backing-store path of a bucket directory.
    #[must_use]
    pub fn bucket_dir(&self, bucket: &str) -> String {
        format!("{}/{bucket}", self.bucket_path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_enabled {
            if self.access_key.is_empty() {
                return Err(ConfigError::MissingAccessKey);
            }
            if self.secret_key.expose().is_empty() {
                return Err(ConfigError::MissingSecretKey);
            }
        }
        if self.bucket_path.is_empty() {
            return Err(ConfigError::MissingBucketPath);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("access_key is required when auth is enabled")]
    MissingAccessKey,
    #[error("secret_key is required when auth is enabled")]
    MissingSecretKey,
    #[error("bucket_path is required")]
    MissingBucketPath,
}
