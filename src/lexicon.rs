// src/lexicon.rs
//! Subject keyword lexicon (TOML), loaded once and shared read-only.
//!
//! One table feeds both scoring passes:
//! - [`LexiconScope::Full`]: core + extended terms of every subject, used
//!   before generation.
//! - [`LexiconScope::Recheck`]: core terms of subjects flagged `recheck`, used
//!   when re-scoring the generated notes.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::subject::SubjectLabel;

pub const ENV_SUBJECT_LEXICON_PATH: &str = "SUBJECT_LEXICON_PATH";

static BUILTIN: Lazy<Arc<Lexicon>> = Lazy::new(|| {
    let raw = include_str!("../config/subject_lexicon.toml");
    Arc::new(Lexicon::from_toml_str(raw).expect("valid subject lexicon"))
});

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse lexicon: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("subject '{0}' is listed more than once")]
    DuplicateSubject(SubjectLabel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexiconScope {
    Full,
    Recheck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEntry {
    pub subject: SubjectLabel,
    pub core: Vec<String>,
    pub extended: Vec<String>,
    pub recheck: bool,
}

impl KeywordEntry {
    pub fn terms(&self, scope: LexiconScope) -> Vec<&str> {
        match scope {
            LexiconScope::Full => self
                .core
                .iter()
                .chain(self.extended.iter())
                .map(String::as_str)
                .collect(),
            LexiconScope::Recheck if self.recheck => {
                self.core.iter().map(String::as_str).collect()
            }
            LexiconScope::Recheck => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: Vec<KeywordEntry>,
}

#[derive(Debug, Deserialize)]
struct LexiconFile {
    #[serde(default)]
    subjects: Vec<SubjectSection>,
}

#[derive(Debug, Deserialize)]
struct SubjectSection {
    label: SubjectLabel,
    #[serde(default)]
    recheck: bool,
    #[serde(default)]
    core: Vec<String>,
    #[serde(default)]
    extended: Vec<String>,
}

impl Lexicon {
    /// Lexicon compiled into the binary.
    pub fn builtin() -> Arc<Lexicon> {
        BUILTIN.clone()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LexiconError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, LexiconError> {
        let file: LexiconFile = toml::from_str(raw)?;
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(file.subjects.len());
        for section in file.subjects {
            if !seen.insert(section.label) {
                return Err(LexiconError::DuplicateSubject(section.label));
            }
            let core = clean_terms(section.core, &HashSet::new());
            let core_set: HashSet<String> = core.iter().cloned().collect();
            let extended = clean_terms(section.extended, &core_set);
            entries.push(KeywordEntry {
                subject: section.label,
                core,
                extended,
                recheck: section.recheck,
            });
        }
        entries.sort_by_key(|e| e.subject.ordinal());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    pub fn entry(&self, subject: SubjectLabel) -> Option<&KeywordEntry> {
        self.entries.iter().find(|e| e.subject == subject)
    }

    /// Subjects that take part in `scope`.
    pub fn subjects(&self, scope: LexiconScope) -> Vec<SubjectLabel> {
        self.entries
            .iter()
            .filter(|e| !e.terms(scope).is_empty())
            .map(|e| e.subject)
            .collect()
    }
}

/// Lowercase, trim, drop empties and duplicates (also those already in `skip`).
fn clean_terms(raw: Vec<String>, skip: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && !skip.contains(t) && seen.insert(t.clone()))
        .collect()
}
