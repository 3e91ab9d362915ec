use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{ports::EvaluationStore, DomainError, EvaluationResult, TestCase};

#[derive(Default)]
pub struct InMemoryEvaluationStore {
    test_cases: Vec<TestCase>,
    results: RwLock<Vec<EvaluationResult>>,
}

impl InMemoryEvaluationStore {
    pub fn with_test_cases(test_cases: Vec<TestCase>) -> Self {
        Self {
            test_cases,
            results: RwLock::new(Vec::new()),
        }
    }

    pub fn results(&self) -> Vec<EvaluationResult> {
        self.results.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EvaluationStore for InMemoryEvaluationStore {
    async fn list_test_cases(&self) -> Result<Vec<TestCase>, DomainError> {
        Ok(self.test_cases.clone())
    }

    async fn save_result(&self, result: &EvaluationResult) -> Result<(), DomainError> {
        self.results
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .push(result.clone());
        Ok(())
    }
}
