use axum::extract::multipart::MultipartError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::io;
use thiserror::Error as ThisError;
use tracing::{debug, error};

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("file is required")]
    MissingFile,

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid multipart body: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("failed to create upload directory: {0}")]
    UploadDir(#[source] io::Error),

    #[error("failed to save uploaded file: {0}")]
    FileSave(#[source] io::Error),

    #[error("{0}")]
    Database(#[from] SqlxError),

    #[error("upload task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("migration {version} failed: {source}")]
    Migration {
        version: i64,
        #[source]
        source: SqlxError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::UploadDir(_)
            | ApiError::FileSave(_)
            | ApiError::Database(_)
            | ApiError::Task(_)
            | ApiError::Migration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let code = match status {
            s if s.is_server_error() => {
                error!(error = %self, "request failed");
                "INTERNAL_ERROR"
            }
            StatusCode::PAYLOAD_TOO_LARGE => {
                debug!(error = %self, "rejected oversized request");
                "PAYLOAD_TOO_LARGE"
            }
            _ => {
                debug!(error = %self, "rejected request");
                "BAD_REQUEST"
            }
        };

        let body = ApiErrorBody {
            code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(ApiErrorResponse { error: body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(ApiError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::BadRequest("nope".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn database_errors_keep_raw_message() {
        let err = ApiError::from(SqlxError::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), SqlxError::RowNotFound.to_string());
    }
}
