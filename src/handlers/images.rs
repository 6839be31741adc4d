use axum::{Json, body::Bytes, extract::State, http::StatusCode};
use tracing::info;

use crate::db::{Image, NewImage, Storage};
use crate::middleware::image_request::ImageCreateRequest;
use crate::upload::UploadStore;
use crate::{ApiError, router::AppState};

/// POST /images -> store an uploaded file (or a client-supplied URL) and record it.
pub async fn create_image(
    State(state): State<AppState>,
    request: ImageCreateRequest,
) -> Result<(StatusCode, Json<Image>), ApiError> {
    let image = match request {
        ImageCreateRequest::Upload {
            title,
            file_name,
            bytes,
        } => {
            let storage = state.storage.clone();
            let uploads = state.uploads.clone();
            // Detached: a dropped connection must not cancel between the insert and `keep`.
            tokio::spawn(store_upload(storage, uploads, title, file_name, bytes)).await??
        }
        ImageCreateRequest::Link(payload) => {
            let image = state
                .storage
                .insert_image(NewImage::new(payload.title, payload.image_url))
                .await?;
            info!(id = image.id, image_url = %image.image_url, "image linked");
            image
        }
    };

    Ok((StatusCode::CREATED, Json(image)))
}

/// Write the file, then its row. The file is removed again if the insert fails.
async fn store_upload(
    storage: Storage,
    uploads: UploadStore,
    title: Option<String>,
    file_name: String,
    bytes: Bytes,
) -> Result<Image, ApiError> {
    let stored = uploads.save(&file_name, &bytes).await?;
    let image = storage
        .insert_image(NewImage::new(title, stored.url()))
        .await?;
    let path = stored.keep();
    info!(
        id = image.id,
        path = %path.display(),
        size = bytes.len(),
        "image uploaded"
    );
    Ok(image)
}

/// GET /images -> every stored image record, oldest first.
pub async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<Image>>, ApiError> {
    Ok(Json(state.storage.list_images().await?))
}
