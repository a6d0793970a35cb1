// src/api.rs
//! HTTP surface: health, database status, note generation from JSON or
//! multipart uploads, and the stored-notes endpoints.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State},
    http::header::CONTENT_TYPE,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analyze::ai_adapter::TokenUsage;
use crate::audio::{prepare_audio, AudioTranscoder, AudioUpload};
use crate::engine::{NoteGenerator, NoteInput};
use crate::error::ApiError;
use crate::store::{DynStore, InputType};

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<NoteGenerator>,
    pub store: DynStore,
    pub transcoder: Arc<dyn AudioTranscoder>,
    pub max_upload_bytes: usize,
}

pub fn router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .route("/api/db-status", get(db_status))
        .route("/api/generate-notes", post(generate_notes))
        .route("/api/notes", get(list_notes))
        .route("/api/notes/{id}", get(get_note).delete(delete_note))
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn db_status(State(state): State<AppState>) -> Json<Value> {
    let attempt = state.store.ensure_connected().await;
    let mut database = json!({
        "connected": state.store.is_connected(),
        "backend": state.store.backend(),
    });
    if let Err(e) = attempt {
        database["error"] = Value::String(e.to_string());
    }
    Json(json!({ "status": "success", "database": database }))
}

/// Uploaded file part of a multipart request.
struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// `POST /api/generate-notes` body, from JSON or multipart form data.
struct GenerateForm {
    kind: Option<String>,
    content: Option<String>,
    file: Option<UploadedFile>,
    content_type: String,
}

impl GenerateForm {
    fn received(&self) -> Value {
        json!({
            "content_type": self.content_type,
            "type": self.kind,
            "has_content": self.content.as_deref().is_some_and(|c| !c.trim().is_empty()),
            "content_length": self.content.as_deref().map(|c| c.chars().count()),
            "file": self.file.as_ref().map(|f| json!({
                "name": f.file_name,
                "mime_type": f.content_type,
                "bytes": f.bytes.len(),
            })),
        })
    }
}

impl<S> FromRequest<S> for GenerateForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state).await.map_err(|e| {
                ApiError::bad_request_with(e.body_text(), json!({ "content_type": content_type }))
            })?;
            return read_multipart(&mut multipart, content_type).await;
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<Value>::from_request(req, state).await.map_err(|e| {
                ApiError::bad_request_with(e.body_text(), json!({ "content_type": content_type }))
            })?;
            let field = |k: &str| body.get(k).and_then(Value::as_str).map(str::to_string);
            return Ok(GenerateForm {
                kind: field("type"),
                content: field("content"),
                file: None,
                content_type,
            });
        }

        Err(ApiError::bad_request_with(
            "expected application/json or multipart/form-data",
            json!({ "content_type": content_type }),
        ))
    }
}

async fn read_multipart(
    multipart: &mut Multipart,
    content_type: String,
) -> Result<GenerateForm, ApiError> {
    let mut form = GenerateForm {
        kind: None,
        content: None,
        file: None,
        content_type,
    };
    let malformed = |e: axum::extract::multipart::MultipartError| {
        ApiError::bad_request(format!("malformed multipart body: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "type" => form.kind = Some(field.text().await.map_err(malformed)?),
            "content" => form.content = Some(field.text().await.map_err(malformed)?),
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?.to_vec();
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }
    Ok(form)
}

#[derive(Serialize)]
struct GenerateResp {
    status: &'static str,
    note_id: Option<Uuid>,
    saved: bool,
    notes: String,
    detected_language: String,
    detected_subject: String,
    input_type: InputType,
    usage: TokenUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

async fn generate_notes(
    State(state): State<AppState>,
    form: GenerateForm,
) -> Result<Json<GenerateResp>, ApiError> {
    let kind = match form.kind.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => k.parse::<InputType>().map_err(|e| {
            ApiError::bad_request_with(format!("{e}; expected 'text' or 'audio'"), form.received())
        })?,
        _ => {
            return Err(ApiError::bad_request_with(
                "missing 'type' (expected 'text' or 'audio')",
                form.received(),
            ))
        }
    };

    let input = match kind {
        InputType::Text => {
            let received = form.received();
            match form.content {
                Some(c) if !c.trim().is_empty() => NoteInput::Text(c),
                _ => {
                    return Err(ApiError::bad_request_with(
                        "missing 'content' for text input",
                        received,
                    ))
                }
            }
        }
        InputType::Audio => {
            let received = form.received();
            let file = match form.file {
                Some(f) if !f.bytes.is_empty() => f,
                _ => {
                    return Err(ApiError::bad_request_with(
                        "missing 'file' for audio input",
                        received,
                    ))
                }
            };
            let file_name = file
                .file_name
                .clone()
                .unwrap_or_else(|| "recording".to_string());
            let audio = prepare_audio(
                AudioUpload {
                    bytes: file.bytes,
                    mime_type: file.content_type,
                    file_name: file.file_name,
                },
                state.transcoder.as_ref(),
            )
            .await?;
            NoteInput::Audio { audio, file_name }
        }
    };

    let outcome = state.generator.generate(input).await?;
    let saved = outcome.saved();
    Ok(Json(GenerateResp {
        status: "success",
        note_id: outcome.note_id(),
        saved,
        detected_language: outcome.language.to_string(),
        detected_subject: outcome.subject.to_string(),
        input_type: outcome.input_type,
        usage: outcome.usage,
        notes: outcome.notes,
        message: (!saved).then_some("Notes generated but could not be saved to the database"),
    }))
}

async fn list_notes(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let notes = state.store.find_all().await?;
    Ok(Json(json!({
        "status": "success",
        "count": notes.len(),
        "notes": notes,
    })))
}

fn parse_note_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::bad_request_with("invalid note id", json!({ "id": raw }))
    })
}

async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_note_id(&id)?;
    let note = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("note {id} not found")))?;
    Ok(Json(json!({ "status": "success", "note": note })))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_note_id(&id)?;
    let note = state
        .store
        .delete_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("note {id} not found")))?;
    info!(%id, "note deleted");
    Ok(Json(json!({
        "status": "success",
        "message": "Note deleted",
        "note": note,
    })))
}
