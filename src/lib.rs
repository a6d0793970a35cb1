// src/lib.rs
// Public library surface for integration tests and the Shuttle binary.

pub mod analyze;
pub mod api;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod language;
pub mod lexicon;
pub mod metrics;
pub mod store;
pub mod subject;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use crate::api::{router, AppState};
pub use crate::engine::{NoteGenerator, NoteInput, NoteOutcome};
pub use crate::error::{ApiError, GenerationError};

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use crate::analyze::ai_adapter::{build_model_from_config, GenerationParams};
use crate::audio::FfmpegTranscoder;
use crate::config::ServiceConfig;
use crate::lexicon::Lexicon;
use crate::store::{DynStore, InMemoryNoteStore, SqliteNoteStore};

/// Wires model, lexicon, store and transcoder from `cfg`.
pub fn build_state(cfg: &ServiceConfig) -> anyhow::Result<AppState> {
    let lexicon = match &cfg.lexicon_path {
        Some(path) => {
            let lexicon = Lexicon::load_from_file(path)?;
            info!(path = %path.display(), "subject lexicon loaded from file");
            Arc::new(lexicon)
        }
        None => Lexicon::builtin(),
    };

    let store: DynStore = if cfg.uses_memory_store() {
        Arc::new(InMemoryNoteStore::new())
    } else {
        prepare_sqlite_dir(&cfg.database_url);
        Arc::new(SqliteNoteStore::new(cfg.database_url.clone()))
    };

    let model = build_model_from_config(&cfg.ai);
    info!(
        provider = model.provider_name(),
        model = %cfg.ai.model,
        store = store.backend(),
        subjects = lexicon.entries().len(),
        "note generator ready"
    );

    let generator = NoteGenerator::new(
        model,
        lexicon,
        GenerationParams::from_config(&cfg.ai),
        store.clone(),
    );

    Ok(AppState {
        generator: Arc::new(generator),
        store,
        transcoder: Arc::new(FfmpegTranscoder::new(cfg.ffmpeg_path.clone())),
        max_upload_bytes: cfg.max_upload_bytes,
    })
}

/// Full application router built from the environment, `/metrics` included
/// when the recorder can be installed.
pub fn app() -> anyhow::Result<Router> {
    let cfg = ServiceConfig::from_env()?;
    let router = api::router(build_state(&cfg)?);
    match crate::metrics::Metrics::init() {
        Ok(m) => Ok(router.merge(m.router())),
        Err(e) => {
            warn!(error = %e, "metrics recorder unavailable; /metrics disabled");
            Ok(router)
        }
    }
}

/// Creates the parent directory of a file-backed sqlite URL. Best effort;
/// a failure surfaces later as "store unavailable".
fn prepare_sqlite_dir(url: &str) {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return;
    };
    let path = rest.split('?').next().unwrap_or(rest).trim_start_matches("//");
    if path.is_empty() || path.contains(":memory:") {
        return;
    }
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(dir = %parent.display(), error = %e, "cannot create database directory");
        }
    }
}
