use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::extract::{extract_text, DocumentKind};
use crate::state::AppState;

/// Upload one document (multipart `file` part) and index it.
///
/// The file name's extension selects PDF vs. plain-text extraction;
/// an empty document indexes zero chunks and is not an error.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|name| name.to_string())
            .ok_or_else(|| ApiError::BadRequest("file part has no filename".to_string()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;

        let kind = DocumentKind::from_file_name(&file_name);
        let text = extract_text(&bytes, kind)?;
        let chunk_count = state.kb.ingest(&text, &file_name).await?;

        return Ok(Json(json!({
            "source": file_name,
            "chunks_indexed": chunk_count
        })));
    }

    Err(ApiError::BadRequest(
        "multipart body must contain a 'file' part".to_string(),
    ))
}
