mod embedding;
mod evaluation;
mod model;
mod record;

pub use embedding::Embedding;
pub use evaluation::{EvaluationResult, TestCase};
pub use model::ModelTag;
pub use record::{filename_from_url, EmbeddingRecord, RankedRecord, SimilarityMatch, StoredRecord};
