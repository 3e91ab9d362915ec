use crate::domain::{errors::DomainError, Embedding, ModelTag};
use async_trait::async_trait;

/// Turns a canonical image into a fixed-length vector.
///
/// Implementations never retry; retry policy belongs to the caller.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// `image` is a `data:image/jpeg;base64,` URI.
    async fn embed(&self, image: &str) -> Result<Embedding, DomainError>;
    fn dimension(&self) -> usize;
    fn model_tag(&self) -> &ModelTag;
}
