// src/config/mod.rs
//! Service configuration: AI settings (`config/ai.json`) plus environment.

pub mod ai;

use std::env;
use std::path::PathBuf;

pub use ai::AiConfig;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/notes.db?mode=rwc";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub ai: AiConfig,
    /// `memory` selects the in-process store.
    pub database_url: String,
    pub lexicon_path: Option<PathBuf>,
    pub ffmpeg_path: String,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let ai = AiConfig::from_env()?;
        let database_url =
            env_non_empty("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let lexicon_path =
            env_non_empty(crate::lexicon::ENV_SUBJECT_LEXICON_PATH).map(PathBuf::from);
        let ffmpeg_path =
            env_non_empty("FFMPEG_PATH").unwrap_or_else(|| DEFAULT_FFMPEG_PATH.into());
        let max_upload_bytes = env_non_empty("MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            ai,
            database_url,
            lexicon_path,
            ffmpeg_path,
            max_upload_bytes,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.trim().eq_ignore_ascii_case("memory")
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
