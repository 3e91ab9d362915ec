use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::services::{run_blocking, BatchOptions, BatchReport, BatchRunner};
use crate::domain::imaging::{self, Resize};
use crate::domain::ports::{BlobStore, EmbeddingProvider, VectorStore};
use crate::domain::{DomainError, EmbeddingRecord};

/// Embeds every image in a storage folder into the vector store.
///
/// Images in the folder were resized on upload, so they are only
/// re-encoded here.
pub struct SeedPipeline {
    blobs: Arc<dyn BlobStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    folder: String,
    options: BatchOptions,
}

impl SeedPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        folder: impl Into<String>,
        options: BatchOptions,
    ) -> Self {
        Self {
            blobs,
            embedder,
            store,
            folder: folder.into(),
            options,
        }
    }

    #[instrument(skip(self), fields(folder = %self.folder, model = %self.embedder.model_tag()))]
    pub async fn run(&self) -> Result<BatchReport, DomainError> {
        let urls: Vec<String> = self
            .blobs
            .list(&self.folder)
            .await?
            .iter()
            .map(|name| self.blobs.public_url(&format!("{}/{}", self.folder, name)))
            .collect();

        info!(count = urls.len(), "embedding images");
        let runner = BatchRunner::new(self.options.clone());
        Ok(runner.run(urls, move |url| self.embed_one(url)).await)
    }

    async fn embed_one(&self, url: String) -> Result<(), DomainError> {
        let bytes = self.blobs.download(&url).await?;
        let data_uri = run_blocking(move || {
            imaging::normalize(&bytes, Resize::NONE)?.to_data_uri()
        })
        .await?;

        let embedding = self.embedder.embed(&data_uri).await?;
        self.store
            .insert(&EmbeddingRecord::from_url(url, embedding))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::imaging::fixtures::solid_png;
    use crate::infrastructure::{InMemoryBlobStore, InMemoryVectorStore};
    use crate::testing::ColorEmbedding;

    async fn seeded_bucket(count: u8) -> Arc<InMemoryBlobStore> {
        let blobs = Arc::new(InMemoryBlobStore::new("https://project.supabase.co", "embedded-images"));
        for i in 0..count {
            blobs
                .upload(solid_png(224, 300, [i * 20, 40, 90]), &format!("v1/img{i}.png"), "image/png")
                .await
                .unwrap();
        }
        blobs
    }

    fn pipeline(blobs: Arc<InMemoryBlobStore>, store: Arc<InMemoryVectorStore>) -> SeedPipeline {
        SeedPipeline::new(
            blobs,
            Arc::new(ColorEmbedding::new()),
            store,
            "v1",
            BatchOptions::new("seed", 5, 10),
        )
    }

    #[tokio::test]
    async fn test_seeds_every_image_in_folder() {
        let blobs = seeded_bucket(7).await;
        blobs
            .upload(solid_png(10, 10, [0, 0, 0]), "uploads/other.png", "image/png")
            .await
            .unwrap();
        let store = Arc::new(InMemoryVectorStore::new());

        let report = pipeline(blobs, store.clone()).run().await.unwrap();

        assert_eq!(report.succeeded, 7);
        assert_eq!(store.len(), 7);
        let record = store.find_by_filename("img3.png").await.unwrap().unwrap();
        assert_eq!(
            record.record.image_url,
            "https://project.supabase.co/storage/v1/object/public/embedded-images/v1/img3.png"
        );
    }

    #[tokio::test]
    async fn test_reseeding_skips_existing_records() {
        let blobs = seeded_bucket(4).await;
        let store = Arc::new(InMemoryVectorStore::new());

        pipeline(blobs.clone(), store.clone()).run().await.unwrap();
        let report = pipeline(blobs, store.clone()).run().await.unwrap();

        assert_eq!(report.skipped, 4);
        assert_eq!(report.failed, 0);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_undecodable_blobs_count_as_failures() {
        let blobs = seeded_bucket(2).await;
        blobs
            .upload(b"not an image".to_vec(), "v1/broken.png", "image/png")
            .await
            .unwrap();
        let store = Arc::new(InMemoryVectorStore::new());

        let report = pipeline(blobs, store.clone()).run().await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.len(), 2);
    }
}
