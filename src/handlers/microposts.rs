use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::db::{Micropost, NewMicropost};
use crate::middleware::json_body::JsonBody;
use crate::{ApiError, router::AppState};

pub async fn create_micropost(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<NewMicropost>,
) -> Result<(StatusCode, Json<Micropost>), ApiError> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content must not be empty".to_string()));
    }

    let post = state.storage.insert_micropost(payload).await?;
    info!(id = post.id, "micropost created");
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_microposts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Micropost>>, ApiError> {
    Ok(Json(state.storage.list_microposts().await?))
}
