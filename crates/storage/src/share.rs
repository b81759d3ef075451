//! File-share adapter: contract documents on a shared directory.
//!
//! The production backend is a directory on a mounted network share; the
//! adapter only ever touches names directly under the share root.
//! Re-uploading a name overwrites the existing file, and listing a root
//! that does not exist yet yields an empty sequence rather than an error.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::sync::Mutex;

/// Name of the contracts share root.
pub const CONTRACTS_SHARE: &str = "contracts";

/// Errors from file share operations.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// Filesystem operation failed.
    #[error("file share I/O error: {0}")]
    Io(#[from] io::Error),

    /// The upload name had no usable filename component.
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
}

/// Capability trait for the contracts file share.
#[async_trait]
pub trait FileShare: Send + Sync + 'static {
    /// Create or overwrite a file of that name at the share root.
    async fn upload(&self, name: &str, bytes: Bytes) -> Result<(), ShareError>;

    /// Every entry name directly under the share root; empty when the
    /// root does not exist yet.
    async fn list(&self) -> Result<Vec<String>, ShareError>;
}

/// Strip path components so uploads cannot escape the share root.
fn filename_of(name: &str) -> Result<&str, ShareError> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ShareError::InvalidName(name.to_owned()))
}

/// File share over a local or mounted directory.
#[derive(Clone, Debug)]
pub struct FsShare {
    root: PathBuf,
}

impl FsShare {
    /// Creates a share over the given root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Idempotently create the share root.
    ///
    /// # Errors
    ///
    /// Returns `ShareError::Io` if the directory cannot be created.
    pub async fn init(&self) -> Result<(), ShareError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}

#[async_trait]
impl FileShare for FsShare {
    async fn upload(&self, name: &str, bytes: Bytes) -> Result<(), ShareError> {
        let filename = filename_of(name)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(self.root.join(filename), &bytes).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, ShareError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        names.sort();

        Ok(names)
    }
}

/// In-memory file share for tests and local development.
#[derive(Clone, Default)]
pub struct MemoryShare {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryShare {
    /// Creates an empty share.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileShare for MemoryShare {
    async fn upload(&self, name: &str, bytes: Bytes) -> Result<(), ShareError> {
        let filename = filename_of(name)?.to_owned();
        self.files.lock().await.insert(filename, bytes);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, ShareError> {
        let files = self.files.lock().await;
        let mut names: Vec<String> = files.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
