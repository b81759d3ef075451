//! Object-store adapter: binary image blobs.
//!
//! Backed by the `object_store` crate, so the same adapter runs against
//! S3, a local directory, or an in-memory store; tests and local
//! development just pick a different backend behind the same `Arc<dyn
//! ObjectStore>`.

use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::ObjectStore;
use url::Url;
use uuid::Uuid;

/// Name of the image container (bucket or directory leaf).
pub const IMAGE_CONTAINER: &str = "product-images";

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Backend operation failed.
    #[error("object store error: {0}")]
    Backend(#[from] object_store::Error),

    /// Local backend directory could not be prepared.
    #[error("blob directory I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upload name had no usable filename component.
    #[error("invalid blob name: {0:?}")]
    InvalidName(String),
}

/// Capability trait for the image blob store.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Store image bytes under a fresh collision-free name derived from
    /// the original filename; returns the public URL.
    ///
    /// Uploads overwrite, so a retried call with the same generated name
    /// is idempotent.
    async fn upload(&self, original_name: &str, bytes: Bytes) -> Result<String, BlobError>;

    /// One public URL per stored blob. Order is whatever the backend
    /// enumeration yields.
    async fn list_urls(&self) -> Result<Vec<String>, BlobError>;
}

/// Image blob store over any `object_store` backend.
#[derive(Clone)]
pub struct ObjectStoreBlobs {
    store: Arc<dyn ObjectStore>,
    /// Public base URL, stored without a trailing slash.
    public_base: String,
}

impl ObjectStoreBlobs {
    /// Create the adapter over an existing backend.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, public_base: &Url) -> Self {
        Self {
            store,
            public_base: public_base.as_str().trim_end_matches('/').to_owned(),
        }
    }

    /// In-memory backend, for tests and local development.
    #[must_use]
    pub fn in_memory(public_base: &Url) -> Self {
        Self::new(Arc::new(InMemory::new()), public_base)
    }

    /// Local-directory backend. Creates the directory if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or opened.
    pub fn local(dir: &FsPath, public_base: &Url) -> Result<Self, BlobError> {
        std::fs::create_dir_all(dir)?;
        let store = LocalFileSystem::new_with_prefix(dir)?;
        Ok(Self::new(Arc::new(store), public_base))
    }

    /// S3 backend; credentials and region come from the environment.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::Backend` if the client cannot be built.
    pub fn amazon(bucket: &str, public_base: &Url) -> Result<Self, BlobError> {
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()?;
        Ok(Self::new(Arc::new(store), public_base))
    }

    fn url_for(&self, name: &str) -> String {
        format!("{}/{name}", self.public_base)
    }
}

#[async_trait]
impl BlobStore for ObjectStoreBlobs {
    async fn upload(&self, original_name: &str, bytes: Bytes) -> Result<String, BlobError> {
        // Strip any path components a browser or client may have attached.
        let filename = FsPath::new(original_name)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| BlobError::InvalidName(original_name.to_owned()))?;

        let name = format!("{}_{filename}", Uuid::new_v4());
        let location = Path::from(name.clone());
        self.store.put(&location, bytes.into()).await?;

        Ok(self.url_for(&name))
    }

    async fn list_urls(&self) -> Result<Vec<String>, BlobError> {
        let mut listing = self.store.list(None);
        let mut urls = Vec::new();

        while let Some(meta) = listing.try_next().await? {
            urls.push(self.url_for(meta.location.as_ref()));
        }

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8080/product-images/").expect("valid url")
    }

    #[tokio::test]
    async fn upload_returns_a_url_ending_in_the_original_name() {
        let blobs = ObjectStoreBlobs::in_memory(&base());
        let url = blobs
            .upload("beans.png", Bytes::from_static(b"\x89PNG"))
            .await
            .expect("upload");

        assert!(url.starts_with("http://127.0.0.1:8080/product-images/"));
        assert!(url.ends_with("_beans.png"));
    }

    #[tokio::test]
    async fn two_uploads_of_the_same_name_do_not_collide() {
        let blobs = ObjectStoreBlobs::in_memory(&base());
        let first = blobs
            .upload("beans.png", Bytes::from_static(b"a"))
            .await
            .expect("upload");
        let second = blobs
            .upload("beans.png", Bytes::from_static(b"b"))
            .await
            .expect("upload");

        assert_ne!(first, second);
        assert_eq!(blobs.list_urls().await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn path_components_are_stripped_from_upload_names() {
        let blobs = ObjectStoreBlobs::in_memory(&base());
        let url = blobs
            .upload("../../etc/beans.png", Bytes::from_static(b"a"))
            .await
            .expect("upload");
        assert!(url.ends_with("_beans.png"));
        assert!(!url.contains(".."));
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let blobs = ObjectStoreBlobs::in_memory(&base());
        assert!(blobs.list_urls().await.expect("list").is_empty());
    }
}
