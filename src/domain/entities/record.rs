use serde::{Deserialize, Deserializer, Serialize};

use super::Embedding;

/// One image's identity and embedding as written to the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub filename: String,
    pub image_url: String,
    #[serde(deserialize_with = "deserialize_embedding")]
    pub embedding: Embedding,
}

impl EmbeddingRecord {
    /// Builds a record whose filename is the last path segment of `image_url`.
    pub fn from_url(image_url: impl Into<String>, embedding: Embedding) -> Self {
        let image_url = image_url.into();
        Self {
            filename: filename_from_url(&image_url).to_string(),
            image_url,
            embedding,
        }
    }
}

/// A record as read back from the store, carrying its store-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub record: EmbeddingRecord,
}

/// A ranked neighbour with the store's native cosine distance.
#[derive(Debug, Clone, Deserialize)]
pub struct RankedRecord {
    pub id: i64,
    pub filename: String,
    pub image_url: String,
    pub distance: f64,
}

impl RankedRecord {
    pub fn similarity(&self) -> f64 {
        1.0 - self.distance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub id: i64,
    pub filename: String,
    pub image_url: String,
    pub similarity: f64,
}

impl From<&RankedRecord> for SimilarityMatch {
    fn from(ranked: &RankedRecord) -> Self {
        Self {
            id: ranked.id,
            filename: ranked.filename.clone(),
            image_url: ranked.image_url.clone(),
            similarity: ranked.similarity(),
        }
    }
}

pub fn filename_from_url(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// pgvector columns come back from PostgREST as the string `"[0.1,0.2]"`;
/// accept that as well as a plain JSON array.
pub(crate) fn deserialize_embedding<'de, D>(deserializer: D) -> Result<Embedding, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Array(Vec<f32>),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Array(values) => Ok(Embedding::new(values)),
        Raw::Text(text) => serde_json::from_str::<Vec<f32>>(&text)
            .map(Embedding::new)
            .map_err(serde::de::Error::custom),
    }
}
