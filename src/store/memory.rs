//! In-process note store. Can be switched "down" to exercise the
//! store-unavailable paths.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{NewNote, NoteRecord, NoteStore, StoreError};

#[derive(Debug)]
pub struct InMemoryNoteStore {
    notes: RwLock<Vec<NoteRecord>>,
    available: AtomicBool,
    connected: AtomicBool,
}

impl Default for InMemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
            connected: AtomicBool::new(false),
        }
    }

    /// A store whose every call fails with `Unavailable`.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.set_available(false);
        store
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if !available {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    pub fn len(&self) -> usize {
        self.notes.read().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is down".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("note lock poisoned".into())
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn ensure_connected(&self) -> Result<(), StoreError> {
        self.check()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn save(&self, note: NewNote) -> Result<NoteRecord, StoreError> {
        self.check()?;
        let record = NoteRecord::from_new(note, Utc::now());
        self.notes
            .write()
            .map_err(|_| poisoned())?
            .push(record.clone());
        Ok(record)
    }

    async fn find_all(&self) -> Result<Vec<NoteRecord>, StoreError> {
        self.check()?;
        let notes = self.notes.read().map_err(|_| poisoned())?;
        // Insertion order is creation order; newest first.
        Ok(notes.iter().rev().cloned().collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError> {
        self.check()?;
        let notes = self.notes.read().map_err(|_| poisoned())?;
        Ok(notes.iter().find(|n| n.id == id).cloned())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, StoreError> {
        self.check()?;
        let mut notes = self.notes.write().map_err(|_| poisoned())?;
        let pos = notes.iter().position(|n| n.id == id);
        Ok(pos.map(|i| notes.remove(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageName;
    use crate::store::InputType;
    use crate::subject::SubjectLabel;

    fn note(text: &str) -> NewNote {
        NewNote {
            input_type: InputType::Text,
            generated_notes: format!("notes for {text}"),
            detected_language: LanguageName::english(),
            detected_subject: SubjectLabel::General,
            original_content: text.into(),
        }
    }

    #[tokio::test]
    async fn crud_round() {
        let store = InMemoryNoteStore::new();
        assert!(!store.is_connected());
        store.ensure_connected().await.unwrap();
        assert!(store.is_connected());

        let a = store.save(note("a")).await.unwrap();
        let b = store.save(note("b")).await.unwrap();
        let all = store.find_all().await.unwrap();
        assert_eq!(all.iter().map(|n| n.id).collect::<Vec<_>>(), vec![b.id, a.id]);

        assert_eq!(store.find_by_id(a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(store.delete_by_id(a.id).await.unwrap(), Some(a.clone()));
        assert_eq!(store.delete_by_id(a.id).await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryNoteStore::unavailable();
        assert!(store.ensure_connected().await.is_err());
        assert!(store.save(note("x")).await.is_err());
        assert!(store.find_all().await.is_err());
        assert!(!store.is_connected());
    }
}
