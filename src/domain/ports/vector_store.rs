use crate::domain::{errors::DomainError, Embedding, EmbeddingRecord, RankedRecord, StoredRecord};
use async_trait::async_trait;

/// Minimum similarity that lets every distance through.
pub const ACCEPT_ALL: f64 = -1.0;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Fails with `DomainError::DuplicateKey` when the filename is taken.
    async fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError>;

    /// At most `top_k` records with similarity >= `min_similarity`,
    /// ordered by ascending distance.
    async fn rank(
        &self,
        query: &Embedding,
        top_k: usize,
        min_similarity: f64,
    ) -> Result<Vec<RankedRecord>, DomainError>;

    async fn find_by_filename(&self, filename: &str) -> Result<Option<StoredRecord>, DomainError>;
}
