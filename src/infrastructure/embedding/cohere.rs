use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{ports::EmbeddingProvider, DomainError, Embedding, ModelTag};
use crate::infrastructure::config::EmbeddingConfig;

const PROVIDER: &str = "cohere";

/// Image embeddings from Cohere's `/v2/embed` endpoint.
pub struct CohereEmbedding {
    http: Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    tag: ModelTag,
}

impl CohereEmbedding {
    pub fn from_config(http: Client, config: &EmbeddingConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tag: ModelTag::new(PROVIDER, config.version.clone()),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    images: [&'a str; 1],
    model: &'a str,
    input_type: &'static str,
    embedding_types: [&'static str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: EmbeddingsByType,
}

#[derive(Deserialize)]
struct EmbeddingsByType {
    #[serde(default)]
    float: Vec<Vec<f32>>,
}

fn first_vector(response: EmbedResponse, dimension: usize) -> Result<Embedding, DomainError> {
    let vector = response
        .embeddings
        .float
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::embedding("empty embedding result"))?;

    if vector.len() != dimension {
        return Err(DomainError::embedding(format!(
            "expected {dimension} dimensions, got {}",
            vector.len()
        )));
    }
    Ok(Embedding::new(vector))
}

#[async_trait]
impl EmbeddingProvider for CohereEmbedding {
    async fn embed(&self, image: &str) -> Result<Embedding, DomainError> {
        let request = EmbedRequest {
            images: [image],
            model: &self.model,
            input_type: "image",
            embedding_types: ["float"],
        };

        let response = self
            .http
            .post(format!("{}/v2/embed", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("Cohere request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".into());
            return Err(DomainError::embedding(format!(
                "Cohere API error {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(e.to_string()))?;

        first_vector(parsed, self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_tag(&self) -> &ModelTag {
        &self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = EmbedRequest {
            images: ["data:image/jpeg;base64,AAAA"],
            model: "embed-english-light-v3.0",
            input_type: "image",
            embedding_types: ["float"],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "images": ["data:image/jpeg;base64,AAAA"],
                "model": "embed-english-light-v3.0",
                "input_type": "image",
                "embedding_types": ["float"]
            })
        );
    }

    #[test]
    fn test_response_dimension_is_checked() {
        let response: EmbedResponse = serde_json::from_str(
            r#"{"id": "x", "embeddings": {"float": [[0.1, 0.2, 0.3]]}, "texts": []}"#,
        )
        .unwrap();
        assert_eq!(first_vector(response, 3).unwrap().dimension(), 3);

        let response: EmbedResponse =
            serde_json::from_str(r#"{"embeddings": {"float": [[0.1, 0.2]]}}"#).unwrap();
        assert!(matches!(
            first_vector(response, 384),
            Err(DomainError::Embedding(_))
        ));

        let response: EmbedResponse = serde_json::from_str(r#"{"embeddings": {}}"#).unwrap();
        assert!(first_vector(response, 384).is_err());
    }

    #[test]
    fn test_model_tag_from_config() {
        let config = EmbeddingConfig::default();
        let provider = CohereEmbedding::from_config(Client::new(), &config);
        assert_eq!(provider.model_tag().table_name(), "embed_cohere_v1");
        assert_eq!(provider.dimension(), 384);
    }
}
