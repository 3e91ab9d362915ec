use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::{error::ApiError, state::AppState};
use crate::domain::SimilarityMatch;

#[derive(Debug, Deserialize)]
pub struct FindSimilarRequest {
    pub image_base64: String,
}

#[derive(Debug, Serialize)]
pub struct FindSimilarResponse {
    pub matches: Vec<SimilarityMatch>,
}

pub async fn find_similar(
    State(state): State<AppState>,
    Json(request): Json<FindSimilarRequest>,
) -> Result<Json<FindSimilarResponse>, ApiError> {
    let matches = state.similarity.find_similar(&request.image_base64).await?;
    Ok(Json(FindSimilarResponse { matches }))
}
