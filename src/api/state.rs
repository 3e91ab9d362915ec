use std::sync::Arc;

use crate::application::SimilarityService;
use crate::infrastructure::{AppConfig, Services};

#[derive(Clone)]
pub struct AppState {
    pub similarity: Arc<SimilarityService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(similarity: SimilarityService, config: Arc<AppConfig>) -> Self {
        Self {
            similarity: Arc::new(similarity),
            config,
        }
    }

    pub fn from_services(services: &Services) -> Self {
        Self::new(services.similarity_service(), services.config.clone())
    }
}
