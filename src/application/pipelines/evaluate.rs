use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::services::{BatchOptions, BatchReport, BatchRunner};
use crate::domain::ports::{EvaluationStore, VectorStore, ACCEPT_ALL};
use crate::domain::{DomainError, EvaluationResult, SimilarityMatch, TestCase};

/// Ranks every labelled test case against the corpus and records the result.
pub struct EvaluatePipeline {
    evaluations: Arc<dyn EvaluationStore>,
    store: Arc<dyn VectorStore>,
    model_name: String,
    top_k: usize,
    options: BatchOptions,
}

impl EvaluatePipeline {
    pub fn new(
        evaluations: Arc<dyn EvaluationStore>,
        store: Arc<dyn VectorStore>,
        model_name: impl Into<String>,
        top_k: usize,
        options: BatchOptions,
    ) -> Self {
        Self {
            evaluations,
            store,
            model_name: model_name.into(),
            top_k,
            options,
        }
    }

    #[instrument(skip(self), fields(model = %self.model_name, top_k = self.top_k))]
    pub async fn run(&self) -> Result<BatchReport, DomainError> {
        let test_cases = self.evaluations.list_test_cases().await?;
        info!(count = test_cases.len(), "evaluating test cases");

        let runner = BatchRunner::new(self.options.clone());
        Ok(runner
            .run(test_cases, move |test_case| self.evaluate_one(test_case))
            .await)
    }

    async fn evaluate_one(&self, test_case: TestCase) -> Result<(), DomainError> {
        let stored = self
            .store
            .find_by_filename(&test_case.filename)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("no embedding for {}", test_case.filename))
            })?;

        let matches: Vec<SimilarityMatch> = self
            .store
            .rank(&stored.record.embedding, self.top_k, ACCEPT_ALL)
            .await?
            .iter()
            // distance 0 is the test case itself
            .filter(|ranked| ranked.distance > 0.0)
            .map(SimilarityMatch::from)
            .collect();

        let result = EvaluationResult::new(
            &test_case,
            &self.model_name,
            stored.record.image_url,
            matches,
        );
        self.evaluations.save_result(&result).await
    }
}
