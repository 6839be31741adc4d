use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde::Deserialize;
use tracing::debug;

use crate::ApiError;
use crate::middleware::json_body::JsonBody;

const TITLE_FIELD: &str = "title";
const FILE_FIELD: &str = "file";

/// Body of `POST /images`, chosen by the request's `Content-Type`.
#[derive(Debug)]
pub enum ImageCreateRequest {
    /// `multipart/form-data` with an optional `title` and a required `file`.
    Upload {
        title: Option<String>,
        file_name: String,
        bytes: Bytes,
    },
    /// `application/json` carrying a client-supplied `image_url`.
    Link(ImageLinkPayload),
}

#[derive(Debug, Deserialize)]
pub struct ImageLinkPayload {
    #[serde(default)]
    pub title: Option<String>,
    pub image_url: String,
}

impl<S> FromRequest<S> for ImageCreateRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
            return read_upload(multipart).await;
        }

        if is_json(&content_type) {
            let JsonBody(payload) = JsonBody::<ImageLinkPayload>::from_request(req, state).await?;
            if payload.image_url.trim().is_empty() {
                return Err(ApiError::BadRequest("image_url must not be empty".to_string()));
            }
            return Ok(Self::Link(payload));
        }

        Err(ApiError::BadRequest(
            "expected multipart/form-data or application/json body".to_string(),
        ))
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence == "application/json" || essence.ends_with("+json")
}

async fn read_upload(mut multipart: Multipart) -> Result<ImageCreateRequest, ApiError> {
    let mut title = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(TITLE_FIELD) => {
                title = Some(field.text().await?);
            }
            Some(FILE_FIELD) => {
                // A part without a filename is a plain form value, not an upload;
                // browsers send `filename=""` when no file was chosen.
                let Some(file_name) = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_owned)
                else {
                    debug!("ignoring file field without a filename");
                    continue;
                };
                let bytes = field.bytes().await?;
                file = Some((file_name, bytes));
            }
            other => {
                debug!(field = ?other, "ignoring unknown multipart field");
            }
        }
    }

    let (file_name, bytes) = file.ok_or(ApiError::MissingFile)?;
    Ok(ImageCreateRequest::Upload {
        title,
        file_name,
        bytes,
    })
}
