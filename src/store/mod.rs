// src/store/mod.rs
//! Persistence gateway for generated notes.
//!
//! `SqliteNoteStore` is the production backend; `InMemoryNoteStore` serves
//! tests and `DATABASE_URL=memory`. Both connect lazily: callers run
//! `ensure_connected()` before use and treat failure as "store unavailable".

pub mod connection;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::language::LanguageName;
use crate::subject::SubjectLabel;

pub use connection::ConnectionManager;
pub use memory::InMemoryNoteStore;
pub use sqlite::SqliteNoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Audio,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Audio => "audio",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(InputType::Text),
            "audio" => Ok(InputType::Audio),
            other => Err(format!("unsupported input type '{other}'")),
        }
    }
}

/// A note about to be written; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub input_type: InputType,
    pub generated_notes: String,
    pub detected_language: LanguageName,
    pub detected_subject: SubjectLabel,
    /// Typed text, or the uploaded file name for audio.
    pub original_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: Uuid,
    pub input_type: InputType,
    pub generated_notes: String,
    pub detected_language: LanguageName,
    pub detected_subject: SubjectLabel,
    pub original_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteRecord {
    pub fn from_new(note: NewNote, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_type: note.input_type,
            generated_notes: note.generated_notes,
            detected_language: note.detected_language,
            detected_subject: note.detected_subject,
            original_content: note.original_content,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Idempotent; establishes the connection on first success.
    async fn ensure_connected(&self) -> Result<(), StoreError>;
    fn is_connected(&self) -> bool;
    /// Backend name for diagnostics.
    fn backend(&self) -> &'static str;

    async fn save(&self, note: NewNote) -> Result<NoteRecord, StoreError>;
    /// Newest first.
    async fn find_all(&self) -> Result<Vec<NoteRecord>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError>;
    /// Returns the removed record.
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError>;
}

pub type DynStore = Arc<dyn NoteStore>;
