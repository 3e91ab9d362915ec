mod blob_store;
mod embedding;
mod evaluation_store;
mod vector_store;

pub use blob_store::BlobStore;
pub use embedding::EmbeddingProvider;
pub use evaluation_store::EvaluationStore;
pub use vector_store::{VectorStore, ACCEPT_ALL};
