use crate::domain::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` at `path` inside the bucket and returns its public URL.
    /// Fails with `DomainError::Conflict` when the path already exists.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        path: &str,
        content_type: &str,
    ) -> Result<String, DomainError>;

    /// Object names directly under `folder`.
    async fn list(&self, folder: &str) -> Result<Vec<String>, DomainError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, DomainError>;

    fn public_url(&self, path: &str) -> String;
}
