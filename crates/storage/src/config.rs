//! Storage configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BACKROOM_DATABASE_URL` - `PostgreSQL` connection string (backs both
//!   the relational adapter and the queue/entity tables)
//!
//! ## Optional
//! - `BACKROOM_IMAGE_BUCKET` - S3 bucket for image blobs; when unset the
//!   object store falls back to a local directory
//! - `BACKROOM_IMAGE_DIR` - local image directory (default:
//!   `./data/product-images`)
//! - `BACKROOM_IMAGE_BASE_URL` - public base URL returned for uploaded
//!   images (default: `http://127.0.0.1:8080/product-images`)
//! - `BACKROOM_CONTRACTS_DIR` - mounted share root for contract documents
//!   (default: `./data/contracts`)
//! - `BACKROOM_QUEUE_LEASE_SECS` - queue message lease duration in seconds
//!   (default: 30)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default lease duration for received queue messages.
pub const DEFAULT_QUEUE_LEASE: Duration = Duration::from_secs(30);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storage layer configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    /// S3 bucket for image blobs; `None` selects the local-directory
    /// backend
    pub image_bucket: Option<String>,
    /// Local directory for image blobs when no bucket is configured
    pub image_dir: PathBuf,
    /// Public base URL under which uploaded images are reachable
    pub image_base_url: Url,
    /// Root directory of the mounted contracts share
    pub contracts_dir: PathBuf,
    /// Lease duration granted to queue consumers per received message
    pub queue_lease: Duration,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = required("BACKROOM_DATABASE_URL")?;

        let image_bucket = optional("BACKROOM_IMAGE_BUCKET");

        let image_dir = optional("BACKROOM_IMAGE_DIR")
            .map_or_else(|| PathBuf::from("./data/product-images"), PathBuf::from);

        let image_base_url = optional("BACKROOM_IMAGE_BASE_URL")
            .unwrap_or_else(|| "http://127.0.0.1:8080/product-images".to_owned());
        let image_base_url = Url::parse(&image_base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("BACKROOM_IMAGE_BASE_URL".to_owned(), e.to_string())
        })?;

        let contracts_dir = optional("BACKROOM_CONTRACTS_DIR")
            .map_or_else(|| PathBuf::from("./data/contracts"), PathBuf::from);

        let queue_lease = match optional("BACKROOM_QUEUE_LEASE_SECS") {
            None => DEFAULT_QUEUE_LEASE,
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ConfigError::InvalidEnvVar(
                        "BACKROOM_QUEUE_LEASE_SECS".to_owned(),
                        format!("expected an integer number of seconds, got {raw:?}"),
                    )
                })?;
                Duration::from_secs(secs)
            }
        };

        Ok(Self {
            database_url: SecretString::from(database_url),
            image_bucket,
            image_dir,
            image_base_url,
            contracts_dir,
            queue_lease,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
