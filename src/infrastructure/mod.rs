pub mod config;
pub mod embedding;
pub mod evaluation;
pub mod http;
pub mod logging;
pub mod storage;
pub mod supabase;
pub mod vector_store;
pub mod wiring;

pub use config::{AppConfig, ConfigError};
pub use embedding::CohereEmbedding;
pub use evaluation::{InMemoryEvaluationStore, SupabaseEvaluationStore};
pub use storage::{InMemoryBlobStore, SupabaseStorage};
pub use supabase::SupabaseClient;
pub use vector_store::{InMemoryVectorStore, SupabaseVectorStore};
pub use wiring::{Services, WiringError};
