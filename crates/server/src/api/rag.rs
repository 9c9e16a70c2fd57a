//! RAG document listing and upload.
//!
//! Upload accepts a single multipart file field, either `.txt` (the whole
//! body becomes one document) or `.json` (a single object, an object with
//! a `documents` array, or a top-level array of entries). Every produced
//! document is stamped with the uploading filename so provenance survives
//! into search results.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use incident_core::{DocumentMetadata, DocumentStatus, DocumentType, RecoveryState};
use serde_json::Value;

use crate::error::ServerError;

use super::AppState;
use super::schemas::{DocumentsResponse, UploadResponse};

/// `GET /rag/documents` -- list every persisted knowledge document, most
/// recently created first.
#[utoipa::path(
    get,
    path = "/rag/documents",
    tag = "Knowledge",
    summary = "List knowledge documents",
    responses(
        (status = 200, description = "All persisted documents", body = DocumentsResponse)
    )
)]
pub async fn list_documents(State(state): State<AppState>) -> impl IntoResponse {
    let documents = state.knowledge.list_documents().await;
    Json(DocumentsResponse { documents })
}

/// `POST /rag/upload` -- ingest one `.txt` or `.json` file into the
/// knowledge store.
#[utoipa::path(
    post,
    path = "/rag/upload",
    tag = "Knowledge",
    summary = "Upload a knowledge document",
    responses(
        (status = 200, description = "Documents ingested", body = UploadResponse),
        (status = 400, description = "Empty, non-UTF-8, or malformed upload")
    )
)]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ServerError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidUpload(format!("malformed multipart body: {e}")))?
        .ok_or_else(|| ServerError::InvalidUpload("no file field present".to_string()))?;

    let filename = field.file_name().unwrap_or("upload").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| ServerError::InvalidUpload(format!("failed to read upload body: {e}")))?;

    if bytes.is_empty() {
        return Err(ServerError::InvalidUpload("upload is empty".to_string()));
    }

    let text = String::from_utf8(bytes.to_vec())
        .map_err(|_| ServerError::InvalidUpload("upload is not valid UTF-8".to_string()))?;

    let stem = filename_stem(&filename);
    let entries = if filename.to_lowercase().ends_with(".json") {
        parse_json_entries(&text, &stem)?
    } else {
        vec![(text, DocumentMetadata {
            title: Some(stem.clone()),
            ..Default::default()
        })]
    };

    let mut keys = Vec::with_capacity(entries.len());
    for (content, mut metadata) in entries {
        metadata.source_filename = Some(filename.clone());
        let key = state.knowledge.record_upload(content, metadata).await;
        keys.push(key);
    }

    Ok(Json(UploadResponse {
        message: format!("ingested {} document(s)", keys.len()),
        documents: keys,
    }))
}

fn filename_stem(filename: &str) -> String {
    std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

/// Parse a JSON upload body into `(content, metadata)` pairs. Accepts a
/// single object, `{"documents": [...]}`, or a bare top-level array.
fn parse_json_entries(text: &str, filename_stem: &str) -> Result<Vec<(String, DocumentMetadata)>, ServerError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ServerError::InvalidUpload(format!("invalid JSON: {e}")))?;

    let raw_entries: Vec<Value> = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("documents") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ServerError::InvalidUpload("`documents` must be an array".to_string())),
            None => vec![Value::Object(map)],
        },
        _ => return Err(ServerError::InvalidUpload("upload must be a JSON object or array".to_string())),
    };

    if raw_entries.is_empty() {
        return Err(ServerError::InvalidUpload("upload contains no documents".to_string()));
    }

    raw_entries
        .into_iter()
        .map(|entry| parse_json_entry(entry, filename_stem))
        .collect()
}

fn parse_json_entry(entry: Value, filename_stem: &str) -> Result<(String, DocumentMetadata), ServerError> {
    let Value::Object(mut map) = entry else {
        return Err(ServerError::InvalidUpload("each document entry must be a JSON object".to_string()));
    };

    let content = ["content", "text", "body"]
        .iter()
        .find_map(|key| map.remove(*key))
        .and_then(|v| v.as_str().map(str::to_string))
        .ok_or_else(|| ServerError::InvalidUpload("document entry is missing content".to_string()))?;
    if content.is_empty() {
        return Err(ServerError::InvalidUpload("document entry has empty content".to_string()));
    }

    let title = map
        .remove("title")
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| filename_stem.to_string());
    let summary = map.remove("summary").and_then(|v| v.as_str().map(str::to_string));
    let scenario_code = map.remove("scenario_code").and_then(|v| v.as_str().map(str::to_string));
    let doc_type = map
        .remove("type")
        .and_then(|v| serde_json::from_value::<DocumentType>(v).ok());
    let status = map
        .remove("status")
        .and_then(|v| serde_json::from_value::<DocumentStatus>(v).ok());
    let recovery_status = map
        .remove("recovery_status")
        .and_then(|v| serde_json::from_value::<RecoveryState>(v).ok());
    let actions = map
        .remove("actions")
        .and_then(|v| v.as_array().cloned())
        .map(|items| items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let created_at = map
        .remove("created_at")
        .and_then(|v| v.as_str().map(str::to_string))
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let mut extra = std::collections::HashMap::new();
    if let Some(Value::Object(flat)) = map.remove("metadata") {
        extra.extend(flat);
    }

    Ok((
        content,
        DocumentMetadata {
            doc_type: Some(doc_type.unwrap_or(DocumentType::Uploaded)),
            scenario_code,
            status,
            recovery_status,
            title: Some(title),
            summary,
            actions,
            created_at,
            recovered_at: None,
            recovery_metrics: None,
            source_filename: None,
            extra,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_stem_drops_extension() {
        assert_eq!(filename_stem("postmortem-2024.txt"), "postmortem-2024");
    }

    #[test]
    fn single_object_upload_yields_one_document() {
        let text = r#"{"content":"hello","title":"Greeting"}"#;
        let entries = parse_json_entries(text, "fallback").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "hello");
        assert_eq!(entries[0].1.title.as_deref(), Some("Greeting"));
    }

    #[test]
    fn documents_wrapper_yields_each_entry() {
        let text = r#"{"documents":[{"content":"a"},{"content":"b"}]}"#;
        let entries = parse_json_entries(text, "fallback").unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn top_level_array_of_one_yields_exactly_one_document() {
        let text = r#"[{"content":"solo"}]"#;
        let entries = parse_json_entries(text, "fallback").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.title.as_deref(), Some("fallback"));
    }

    #[test]
    fn entry_missing_content_is_rejected() {
        let text = r#"[{"title":"no content here"}]"#;
        let err = parse_json_entries(text, "fallback").unwrap_err();
        assert!(matches!(err, ServerError::InvalidUpload(_)));
    }

    #[test]
    fn flat_metadata_object_is_merged_into_extra() {
        let text = r#"{"content":"x","metadata":{"team":"sre"}}"#;
        let entries = parse_json_entries(text, "fallback").unwrap();
        assert_eq!(entries[0].1.extra.get("team").unwrap(), "sre");
    }
}
