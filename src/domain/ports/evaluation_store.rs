use crate::domain::{errors::DomainError, EvaluationResult, TestCase};
use async_trait::async_trait;

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn list_test_cases(&self) -> Result<Vec<TestCase>, DomainError>;
    async fn save_result(&self, result: &EvaluationResult) -> Result<(), DomainError>;
}
