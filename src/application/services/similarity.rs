use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::run_blocking;
use crate::domain::imaging::{self, OutputFormat, Resize, ResizePolicy, DEFAULT_MAX_SIDE};
use crate::domain::ports::{BlobStore, EmbeddingProvider, VectorStore, ACCEPT_ALL};
use crate::domain::{DomainError, EmbeddingRecord, SimilarityMatch};

/// When the embedding of a fresh query image is written to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Before the response is returned; insert failures fail the request.
    #[default]
    Inline,
    /// In a detached task after ranking; failures are only logged.
    Background,
}

#[derive(Debug, Clone)]
pub struct SimilaritySettings {
    pub match_count: usize,
    pub resize_to: u32,
    /// Longest side an upscaled query image may reach.
    pub max_side: u32,
    pub upload_folder: String,
    /// Top matches at or below this distance are treated as the query itself.
    pub self_match_epsilon: f64,
    pub persist: PersistMode,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        Self {
            match_count: 10,
            resize_to: 224,
            max_side: DEFAULT_MAX_SIDE,
            upload_folder: "uploads".to_string(),
            self_match_epsilon: 0.0,
            persist: PersistMode::Inline,
        }
    }
}

pub struct SimilarityService {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    blob_store: Arc<dyn BlobStore>,
    settings: SimilaritySettings,
}

impl SimilarityService {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        blob_store: Arc<dyn BlobStore>,
        settings: SimilaritySettings,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            blob_store,
            settings,
        }
    }

    pub fn settings(&self) -> &SimilaritySettings {
        &self.settings
    }

    /// Embeds and stores the query image, then returns its nearest neighbours.
    ///
    /// If the nearest neighbour is the query image itself it is dropped from
    /// the result and nothing new is written.
    #[instrument(skip(self, image_base64), fields(payload_len = image_base64.len()))]
    pub async fn find_similar(
        &self,
        image_base64: &str,
    ) -> Result<Vec<SimilarityMatch>, DomainError> {
        let input = image_base64.to_owned();
        let spec = Resize::new(self.settings.resize_to, ResizePolicy::UpscaleOnly)
            .with_max_side(self.settings.max_side);
        let (jpeg, data_uri) = run_blocking(move || {
            let normalized = imaging::normalize_base64(&input, spec)?;
            let jpeg = normalized.to_jpeg()?;
            let data_uri = imaging::jpeg_data_uri(&jpeg);
            Ok((jpeg, data_uri))
        })
        .await?;

        let path = format!("{}/{}.jpg", self.settings.upload_folder, Uuid::new_v4());
        // both branches run to completion even when one of them fails
        let (embedded, uploaded) = tokio::join!(
            self.embedder.embed(&data_uri),
            self.blob_store
                .upload(jpeg, &path, OutputFormat::Jpeg.content_type()),
        );
        let embedding = embedded?;
        let image_url = uploaded?;

        let ranked = self
            .vector_store
            .rank(&embedding, self.settings.match_count, ACCEPT_ALL)
            .await?;

        let is_self_match = ranked
            .first()
            .is_some_and(|top| top.distance <= self.settings.self_match_epsilon);

        let mut matches: Vec<SimilarityMatch> = ranked.iter().map(SimilarityMatch::from).collect();

        if is_self_match {
            let dropped = matches.remove(0);
            debug!(filename = %dropped.filename, "query image already embedded");
        } else {
            self.persist(EmbeddingRecord::from_url(image_url, embedding))
                .await?;
        }

        matches.truncate(self.settings.match_count);
        info!(matches = matches.len(), self_match = is_self_match, "similarity search complete");
        Ok(matches)
    }

    async fn persist(&self, record: EmbeddingRecord) -> Result<(), DomainError> {
        match self.settings.persist {
            PersistMode::Inline => insert_record(self.vector_store.as_ref(), &record).await,
            PersistMode::Background => {
                let store = self.vector_store.clone();
                tokio::spawn(async move {
                    if let Err(e) = insert_record(store.as_ref(), &record).await {
                        warn!(filename = %record.filename, error = %e, "background insert failed");
                    }
                });
                Ok(())
            }
        }
    }
}

async fn insert_record(store: &dyn VectorStore, record: &EmbeddingRecord) -> Result<(), DomainError> {
    match store.insert(record).await {
        Err(e) if e.is_skippable() => {
            info!(filename = %record.filename, "embedding already stored");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::imaging::fixtures::solid_png;
    use crate::domain::Embedding;
    use crate::infrastructure::{InMemoryBlobStore, InMemoryVectorStore};
    use crate::testing::{ColorEmbedding, FailingEmbedding};
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn b64_png(rgb: [u8; 3]) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(solid_png(320, 240, rgb)))
    }

    struct Harness {
        service: SimilarityService,
        store: Arc<InMemoryVectorStore>,
        blobs: Arc<InMemoryBlobStore>,
    }

    fn harness(settings: SimilaritySettings) -> Harness {
        let store = Arc::new(InMemoryVectorStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new("https://project.supabase.co", "embedded-images"));
        let service = SimilarityService::new(
            Arc::new(ColorEmbedding::new()),
            store.clone(),
            blobs.clone(),
            settings,
        );
        Harness {
            service,
            store,
            blobs,
        }
    }

    #[tokio::test]
    async fn test_empty_corpus_inserts_and_returns_nothing() {
        let h = harness(SimilaritySettings::default());

        let matches = h.service.find_similar(&b64_png([200, 10, 10])).await.unwrap();

        assert!(matches.is_empty());
        assert_eq!(h.store.len(), 1);
        assert_eq!(h.blobs.len(), 1);

        let stored = &h.store.records()[0];
        assert!(stored.record.filename.ends_with(".jpg"));
        assert!(stored
            .record
            .image_url
            .starts_with("https://project.supabase.co/storage/v1/object/public/embedded-images/uploads/"));
        assert!(stored.record.image_url.ends_with(&stored.record.filename));
    }

    #[tokio::test]
    async fn test_identical_query_is_suppressed_and_not_reinserted() {
        let h = harness(SimilaritySettings::default());
        let image = b64_png([10, 200, 30]);

        h.service.find_similar(&image).await.unwrap();
        let matches = h.service.find_similar(&image).await.unwrap();

        assert!(matches.is_empty());
        assert!(matches.iter().all(|m| m.similarity < 1.0));
        assert_eq!(h.store.len(), 1);
        // the copy is still uploaded, only the embedding is deduplicated
        assert_eq!(h.blobs.len(), 2);
    }

    #[tokio::test]
    async fn test_distinct_query_returns_ordered_matches_and_inserts() {
        let h = harness(SimilaritySettings::default());
        for rgb in [[250, 0, 0], [0, 0, 250], [240, 20, 0]] {
            h.service.find_similar(&b64_png(rgb)).await.unwrap();
        }

        let matches = h.service.find_similar(&b64_png([245, 10, 5])).await.unwrap();

        assert_eq!(matches.len(), 3);
        assert!(matches.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!(matches.iter().all(|m| (-1.0..=1.0).contains(&m.similarity)));
        assert_eq!(h.store.len(), 4);
    }

    #[tokio::test]
    async fn test_match_count_truncates() {
        let h = harness(SimilaritySettings {
            match_count: 2,
            ..Default::default()
        });
        for shade in [10u8, 60, 110, 160] {
            h.service.find_similar(&b64_png([shade, 90, 200])).await.unwrap();
        }

        let matches = h.service.find_similar(&b64_png([5, 250, 5])).await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn test_near_duplicate_within_epsilon_is_suppressed() {
        let h = harness(SimilaritySettings {
            self_match_epsilon: 0.01,
            ..Default::default()
        });
        h.store
            .insert(&EmbeddingRecord::from_url(
                "https://host/near.jpg",
                Embedding::new(vec![1.0, 0.0]),
            ))
            .await
            .unwrap();
        let service = SimilarityService::new(
            Arc::new(crate::testing::FixedEmbedding::new(vec![1.0, 0.001])),
            h.store.clone(),
            h.blobs.clone(),
            h.service.settings().clone(),
        );

        let matches = service.find_similar(&b64_png([1, 1, 1])).await.unwrap();
        assert!(matches.is_empty());
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_background_persist_eventually_inserts() {
        let h = harness(SimilaritySettings {
            persist: PersistMode::Background,
            ..Default::default()
        });

        let matches = h.service.find_similar(&b64_png([1, 2, 3])).await.unwrap();
        assert!(matches.is_empty());

        for _ in 0..50 {
            if h.store.len() == 1 {
                return;
            }
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("background insert never landed");
    }

    #[tokio::test]
    async fn test_bad_image_is_a_decode_error() {
        let h = harness(SimilaritySettings::default());
        let err = h.service.find_similar("data:image/png;base64,aGVsbG8=").await.unwrap_err();

        assert!(matches!(err, DomainError::Decode(_)));
        assert_eq!(h.store.len(), 0);
        assert_eq!(h.blobs.len(), 0);
    }

    /// Bucket whose uploads finish well after a failing embedding returns.
    struct SlowBlobStore(InMemoryBlobStore);

    #[async_trait::async_trait]
    impl BlobStore for SlowBlobStore {
        async fn upload(
            &self,
            bytes: Vec<u8>,
            path: &str,
            content_type: &str,
        ) -> Result<String, DomainError> {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            self.0.upload(bytes, path, content_type).await
        }

        async fn list(&self, folder: &str) -> Result<Vec<String>, DomainError> {
            self.0.list(folder).await
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, DomainError> {
            self.0.download(url).await
        }

        fn public_url(&self, path: &str) -> String {
            self.0.public_url(path)
        }
    }

    #[tokio::test]
    async fn test_upload_completes_when_embedding_fails_first() {
        let blobs = Arc::new(SlowBlobStore(InMemoryBlobStore::new("https://host", "bucket")));
        let store = Arc::new(InMemoryVectorStore::new());
        let service = SimilarityService::new(
            Arc::new(FailingEmbedding),
            store.clone(),
            blobs.clone(),
            SimilaritySettings::default(),
        );

        let err = service.find_similar(&b64_png([4, 4, 4])).await.unwrap_err();

        assert!(matches!(err, DomainError::Embedding(_)));
        assert_eq!(blobs.0.len(), 1);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_oversized_upscale_is_a_decode_error() {
        let h = harness(SimilaritySettings::default());
        let sliver = format!("data:image/png;base64,{}", STANDARD.encode(solid_png(1, 3000, [7, 7, 7])));

        let err = h.service.find_similar(&sliver).await.unwrap_err();

        assert!(matches!(err, DomainError::Decode(_)));
        assert_eq!(h.blobs.len(), 0);
        assert_eq!(h.store.len(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let store = Arc::new(InMemoryVectorStore::new());
        let service = SimilarityService::new(
            Arc::new(FailingEmbedding),
            store.clone(),
            Arc::new(InMemoryBlobStore::new("https://host", "bucket")),
            SimilaritySettings::default(),
        );

        let err = service.find_similar(&b64_png([9, 9, 9])).await.unwrap_err();
        assert!(matches!(err, DomainError::Embedding(_)));
        assert_eq!(store.len(), 0);
    }
}
