//! Configuration loading and validation for the protect service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use protect::MasterKey;
use serde::Deserialize;

/// Which blob backend stores documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local directory tree under `STORAGE_ROOT`.
    Filesystem,
    /// S3 bucket `S3_BUCKET`.
    S3,
}

/// A string that must never be printed.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    /// Borrow the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base64 256-bit encryption key. **Required.**
    pub encryption_key: SecretString,

    /// Document backend.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// Root directory for the filesystem backend.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// Bucket for the S3 backend. **Required** when `STORAGE_BACKEND=s3`.
    #[serde(default)]
    pub s3_bucket: Option<String>,

    /// Optional endpoint override for S3-compatible object stores.
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,

    /// Externally reachable base URL embedded in temporary access URLs.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Longest lifetime a caller may request for an access URL.
    #[serde(default = "default_access_url_max_minutes")]
    pub access_url_max_minutes: u32,

    /// OTLP endpoint for trace export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Filesystem
}
fn default_storage_root() -> String {
    "./data/vault".into()
}
fn default_public_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_http_port() -> u16 {
    8080
}
fn default_access_url_max_minutes() -> u32 {
    1440
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Decode the configured encryption key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not Base64 or not 32 bytes long.
    pub fn master_key(&self) -> Result<MasterKey> {
        MasterKey::from_base64(self.encryption_key.expose())
            .context("ENCRYPTION_KEY must be a base64-encoded 256-bit key")
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(self.encryption_key.expose(), "ENCRYPTION_KEY")?;
        self.master_key()?;

        match self.storage_backend {
            StorageBackend::Filesystem => ensure_non_empty(&self.storage_root, "STORAGE_ROOT")?,
            StorageBackend::S3 => {
                ensure_non_empty(self.s3_bucket.as_deref().unwrap_or(""), "S3_BUCKET")?
            }
        }

        if !(self.public_base_url.starts_with("http://")
            || self.public_base_url.starts_with("https://"))
        {
            anyhow::bail!("PUBLIC_BASE_URL must be an http:// or https:// URL");
        }
        if self.access_url_max_minutes == 0 {
            anyhow::bail!("ACCESS_URL_MAX_MINUTES must be > 0");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
