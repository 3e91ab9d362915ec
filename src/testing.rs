//! Deterministic embedding providers for unit tests.

use async_trait::async_trait;

use crate::domain::imaging::{self, Resize};
use crate::domain::ports::EmbeddingProvider;
use crate::domain::{DomainError, Embedding, ModelTag};

/// Embeds an image as its mean colour plus a constant bias component, so
/// identical images collide and similar colours rank close together.
pub struct ColorEmbedding {
    tag: ModelTag,
}

impl ColorEmbedding {
    pub fn new() -> Self {
        Self {
            tag: ModelTag::new("test", "v1"),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ColorEmbedding {
    async fn embed(&self, image: &str) -> Result<Embedding, DomainError> {
        let decoded = imaging::normalize_base64(image, Resize::NONE)?;
        let rgb = decoded.as_image().to_rgb8();

        let mut sums = [0f64; 3];
        for pixel in rgb.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += f64::from(channel);
            }
        }
        let count = f64::from(rgb.width() * rgb.height()).max(1.0);

        let mut vector: Vec<f32> = sums
            .iter()
            .map(|sum| (sum / count / 255.0) as f32)
            .collect();
        vector.push(1.0);
        Ok(Embedding::new(vector))
    }

    fn dimension(&self) -> usize {
        4
    }

    fn model_tag(&self) -> &ModelTag {
        &self.tag
    }
}

/// Returns the same vector for every input.
pub struct FixedEmbedding {
    vector: Vec<f32>,
    tag: ModelTag,
}

impl FixedEmbedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            tag: ModelTag::new("fixed", "v1"),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedding {
    async fn embed(&self, _image: &str) -> Result<Embedding, DomainError> {
        Ok(Embedding::new(self.vector.clone()))
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn model_tag(&self) -> &ModelTag {
        &self.tag
    }
}

pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingProvider for FailingEmbedding {
    async fn embed(&self, _image: &str) -> Result<Embedding, DomainError> {
        Err(DomainError::embedding("provider unavailable"))
    }

    fn dimension(&self) -> usize {
        0
    }

    fn model_tag(&self) -> &ModelTag {
        static TAG: std::sync::OnceLock<ModelTag> = std::sync::OnceLock::new();
        TAG.get_or_init(|| ModelTag::new("failing", "v1"))
    }
}
