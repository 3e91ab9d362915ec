use std::sync::Arc;

use crate::application::{EvaluatePipeline, SeedPipeline, SimilarityService, UploadPipeline};
use crate::domain::ports::{BlobStore, EmbeddingProvider, EvaluationStore, VectorStore};
use crate::infrastructure::config::{AppConfig, ConfigError, EmbeddingProviderKind};
use crate::infrastructure::embedding::CohereEmbedding;
use crate::infrastructure::evaluation::SupabaseEvaluationStore;
use crate::infrastructure::http::build_client;
use crate::infrastructure::storage::SupabaseStorage;
use crate::infrastructure::supabase::SupabaseClient;
use crate::infrastructure::vector_store::SupabaseVectorStore;

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Client(#[from] crate::domain::DomainError),
}

/// Adapters built once per process and shared by every entry point.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStore>,
    pub blob_store: Arc<dyn BlobStore>,
    pub evaluation_store: Arc<dyn EvaluationStore>,
}

impl Services {
    pub fn from_config(config: AppConfig) -> Result<Self, WiringError> {
        config.validate()?;
        let http = build_client(&config.http)?;
        let supabase = SupabaseClient::new(http.clone(), &config.supabase);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.provider {
            EmbeddingProviderKind::Cohere => {
                Arc::new(CohereEmbedding::from_config(http, &config.embedding))
            }
        };
        let vector_store = Arc::new(SupabaseVectorStore::new(
            supabase.clone(),
            embedder.model_tag(),
        ));
        let blob_store = Arc::new(SupabaseStorage::new(
            supabase.clone(),
            config.supabase.bucket.clone(),
        ));
        let evaluation_store = Arc::new(SupabaseEvaluationStore::new(supabase));

        tracing::info!(
            model = %embedder.model_tag(),
            dimension = embedder.dimension(),
            bucket = %config.supabase.bucket,
            "services initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            embedder,
            vector_store,
            blob_store,
            evaluation_store,
        })
    }

    pub fn similarity_service(&self) -> SimilarityService {
        SimilarityService::new(
            self.embedder.clone(),
            self.vector_store.clone(),
            self.blob_store.clone(),
            self.config.search.settings(),
        )
    }

    pub fn seed_pipeline(&self) -> SeedPipeline {
        let seed = &self.config.pipelines.seed;
        SeedPipeline::new(
            self.blob_store.clone(),
            self.embedder.clone(),
            self.vector_store.clone(),
            seed.folder.clone(),
            seed.batch.options("seed"),
        )
    }

    pub fn evaluate_pipeline(&self) -> EvaluatePipeline {
        let evaluate = &self.config.pipelines.evaluate;
        EvaluatePipeline::new(
            self.evaluation_store.clone(),
            self.vector_store.clone(),
            self.embedder.model_tag().model_name(),
            evaluate.top_k,
            evaluate.batch.options("evaluate"),
        )
    }

    pub fn upload_pipeline(&self) -> UploadPipeline {
        let upload = &self.config.pipelines.upload;
        UploadPipeline::new(
            self.blob_store.clone(),
            upload.images_dir.clone(),
            upload.folder.clone(),
            upload.resize_to,
            upload.batch.options("upload"),
        )
        .with_max_side(upload.max_side)
    }
}
