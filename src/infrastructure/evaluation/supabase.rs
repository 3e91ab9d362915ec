use async_trait::async_trait;

use crate::domain::{ports::EvaluationStore, DomainError, EvaluationResult, TestCase};
use crate::infrastructure::supabase::SupabaseClient;

const EXPECTED_TABLE: &str = "evals_expected";
const ACTUAL_TABLE: &str = "evals_actual";

/// Labelled test cases and recorded results, kept in two PostgREST tables.
pub struct SupabaseEvaluationStore {
    client: SupabaseClient,
}

impl SupabaseEvaluationStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EvaluationStore for SupabaseEvaluationStore {
    async fn list_test_cases(&self) -> Result<Vec<TestCase>, DomainError> {
        let mut url = self.client.rest_url(EXPECTED_TABLE)?;
        url.query_pairs_mut().append_pair("select", "*");

        self.client
            .send_rest(self.client.http().get(url))
            .await?
            .json()
            .await
            .map_err(|e| DomainError::external(format!("invalid test cases: {e}")))
    }

    async fn save_result(&self, result: &EvaluationResult) -> Result<(), DomainError> {
        let url = self.client.rest_url(ACTUAL_TABLE)?;
        let request = self
            .client
            .http()
            .post(url)
            .header("Prefer", "return=minimal")
            .json(result);

        self.client.send_rest(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SimilarityMatch;

    #[test]
    fn test_test_cases_ignore_extra_columns() {
        let rows: Vec<TestCase> = serde_json::from_str(
            r#"[{"id": 3, "filename": "a.jpg", "matches_expected": ["b.jpg"], "matches_potential": []}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].id, 3);
        assert_eq!(rows[0].filename, "a.jpg");
    }

    #[test]
    fn test_result_row_shape() {
        let case = TestCase {
            id: 3,
            filename: "a.jpg".into(),
        };
        let result = EvaluationResult::new(
            &case,
            "cohere_v1",
            "https://host/v1/a.jpg",
            vec![SimilarityMatch {
                id: 7,
                filename: "b.jpg".into(),
                image_url: "https://host/v1/b.jpg".into(),
                similarity: 0.75,
            }],
        );

        let row = serde_json::to_value(&result).unwrap();
        assert_eq!(row["expected_id"], 3);
        assert_eq!(row["model"], "cohere_v1");
        assert_eq!(row["filename"], "a.jpg");
        assert_eq!(row["matches"][0]["similarity"], 0.75);
    }
}
