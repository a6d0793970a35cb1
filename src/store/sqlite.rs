//! SQLite-backed note store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{ConnectionManager, NewNote, NoteRecord, NoteStore, StoreError};
use crate::language::LanguageName;

const SELECT_COLUMNS: &str = "id, input_type, generated_notes, detected_language, detected_subject, original_content, created_at, updated_at";

#[derive(Debug)]
pub struct SqliteNoteStore {
    conn: ConnectionManager,
}

impl SqliteNoteStore {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            conn: ConnectionManager::new(url),
        }
    }
}

fn row_to_record(row: &SqliteRow) -> Result<NoteRecord, StoreError> {
    let id: String = row.try_get("id")?;
    let input_type: String = row.try_get("input_type")?;
    let subject: String = row.try_get("detected_subject")?;
    let language: String = row.try_get("detected_language")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(NoteRecord {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("id '{id}': {e}")))?,
        input_type: input_type.parse().map_err(StoreError::Corrupt)?,
        generated_notes: row.try_get("generated_notes")?,
        detected_language: LanguageName::new(language),
        detected_subject: subject
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
        original_content: row.try_get("original_content")?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn ensure_connected(&self) -> Result<(), StoreError> {
        self.conn.ensure_connected().await.map(|_| ())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn save(&self, note: NewNote) -> Result<NoteRecord, StoreError> {
        let pool = self.conn.ensure_connected().await?;
        let record = NoteRecord::from_new(note, Utc::now());

        sqlx::query(
            "INSERT INTO notes (id, input_type, generated_notes, detected_language, detected_subject, original_content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.input_type.as_str())
        .bind(&record.generated_notes)
        .bind(record.detected_language.as_str())
        .bind(record.detected_subject.as_str())
        .bind(&record.original_content)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(pool)
        .await?;

        Ok(record)
    }

    async fn find_all(&self) -> Result<Vec<NoteRecord>, StoreError> {
        let pool = self.conn.ensure_connected().await?;
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM notes ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError> {
        let pool = self.conn.ensure_connected().await?;
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM notes WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError> {
        let pool = self.conn.ensure_connected().await?;
        let mut tx = pool.begin().await?;
        let row = sqlx::query(&format!("SELECT {SELECT_COLUMNS} FROM notes WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let record = row_to_record(&row)?;
        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(record))
    }
}
