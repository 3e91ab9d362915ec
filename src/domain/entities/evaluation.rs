use serde::{Deserialize, Serialize};
use std::fmt;

use super::SimilarityMatch;

/// A labelled image whose neighbours are inspected during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub filename: String,
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test case {} ({})", self.id, self.filename)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub expected_id: i64,
    pub model: String,
    pub image_url: String,
    pub filename: String,
    pub matches: Vec<SimilarityMatch>,
}

impl EvaluationResult {
    pub fn new(
        test_case: &TestCase,
        model: impl Into<String>,
        image_url: impl Into<String>,
        matches: Vec<SimilarityMatch>,
    ) -> Self {
        Self {
            expected_id: test_case.id,
            model: model.into(),
            image_url: image_url.into(),
            filename: test_case.filename.clone(),
            matches,
        }
    }
}
