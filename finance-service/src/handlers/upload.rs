use crate::dtos::UploadResponse;
use crate::middleware::UserId;
use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use service_core::error::AppError;

/// Multipart field carrying the statement file.
pub const STATEMENT_FIELD: &str = "statement";

/// Run the ingestion pipeline on an uploaded PDF or CSV statement.
pub async fn upload_statement(
    State(state): State<AppState>,
    user_id: UserId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart.map_err(|rejection| {
        AppError::BadRequest(anyhow::anyhow!(
            "Expected a multipart upload: {}",
            rejection.body_text()
        ))
    })?;
    let (mime_type, data) = read_statement_field(&mut multipart).await?;

    let outcome = state.ingestor.ingest(&user_id.0, &mime_type, data).await?;

    Ok(Json(UploadResponse {
        success: true,
        new_transactions_count: outcome.inserted,
    }))
}

/// Declared content type and bytes of the `statement` field. Other fields
/// are ignored.
async fn read_statement_field(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(STATEMENT_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        tracing::debug!(
            mime_type = %mime_type,
            size = data.len(),
            "Statement received"
        );

        return Ok((mime_type, data));
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file provided.")))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::BadRequest(anyhow::anyhow!("File too large."));
    }
    AppError::BadRequest(anyhow::anyhow!("Failed to read upload: {}", err.body_text()))
}
