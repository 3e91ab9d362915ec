mod batch;
mod similarity;

pub use batch::{BatchOptions, BatchReport, BatchRunner, RunContext};
pub use similarity::{PersistMode, SimilarityService, SimilaritySettings};

use crate::domain::DomainError;

/// Runs CPU-bound image work off the async workers.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, DomainError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::internal(format!("blocking task failed: {e}")))?
}
