use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{
    ports::VectorStore, DomainError, Embedding, EmbeddingRecord, RankedRecord, StoredRecord,
};

/// Brute-force cosine store with the same uniqueness and ordering contract
/// as the hosted table.
pub struct InMemoryVectorStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<StoredRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, record: &EmbeddingRecord) -> Result<(), DomainError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if store.iter().any(|r| r.record.filename == record.filename) {
            return Err(DomainError::duplicate_key(format!(
                "filename {} already exists",
                record.filename
            )));
        }

        let id = store.len() as i64 + 1;
        store.push(StoredRecord {
            id,
            record: record.clone(),
        });
        Ok(())
    }

    async fn rank(
        &self,
        query: &Embedding,
        top_k: usize,
        min_similarity: f64,
    ) -> Result<Vec<RankedRecord>, DomainError> {
        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<RankedRecord> = store
            .iter()
            .map(|stored| RankedRecord {
                id: stored.id,
                filename: stored.record.filename.clone(),
                image_url: stored.record.image_url.clone(),
                distance: query.cosine_distance(&stored.record.embedding),
            })
            .filter(|ranked| ranked.similarity() >= min_similarity)
            .collect();

        // stable: ties keep insertion order
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn find_by_filename(&self, filename: &str) -> Result<Option<StoredRecord>, DomainError> {
        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        Ok(store.iter().find(|r| r.record.filename == filename).cloned())
    }
}
