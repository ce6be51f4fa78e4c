//! Request handlers for the intake API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use super::AppState;
use crate::error::IntakeError;

/// Multipart field that carries the document.
pub const FILE_FIELD: &str = "file";

/// POST /extract: OCR the first page of the uploaded PDF and return the
/// extracted fields, or `{}` when the document has no pages.
pub async fn extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, IntakeError> {
    let multipart = multipart.map_err(|rejection| IntakeError::BadUpload {
        detail: rejection.body_text(),
        status: rejection.status(),
    })?;

    let document = read_document(multipart).await?;
    info!("Received upload: {} bytes", document.len());

    let outcome = state.process(document).await?;
    Ok(Json(outcome).into_response())
}

/// Pull the document out of the form.
///
/// The `file` field wins; otherwise the first field that carries a filename
/// is used, so clients that name the field differently still work.
async fn read_document(mut multipart: Multipart) -> Result<axum::body::Bytes, IntakeError> {
    let mut fallback = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let is_file_field = field.name() == Some(FILE_FIELD);
        let has_filename = field.file_name().is_some();

        if is_file_field {
            return field.bytes().await.map_err(upload_error);
        }
        if fallback.is_none() && has_filename {
            fallback = Some(field.bytes().await.map_err(upload_error)?);
        }
    }

    fallback.ok_or(IntakeError::MissingFile)
}

fn upload_error(e: axum::extract::multipart::MultipartError) -> IntakeError {
    IntakeError::BadUpload {
        detail: e.body_text(),
        status: e.status(),
    }
}

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!("Intake failed ({}): {}", self.kind(), self);
        } else {
            info!("Intake rejected ({}): {}", self.kind(), self);
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
