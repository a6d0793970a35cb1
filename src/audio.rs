// src/audio.rs
//! Audio upload preparation.
//!
//! Formats the model accepts directly pass through; anything else is converted
//! to 16 kHz mono WAV by an external encoder (`ffmpeg`).

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["wav", "mp3", "flac", "ogg", "aac", "aiff"];

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start encoder '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoder produced no output")]
    EmptyOutput,
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub transcoded: bool,
}

/// Lowercase extension for an upload, from MIME type first, then file name.
pub fn resolve_extension(mime_type: Option<&str>, file_name: Option<&str>) -> Option<String> {
    let from_mime = mime_type.and_then(|m| {
        let essence = m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase();
        let ext = match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => "wav",
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" | "audio/x-mpeg-3" => "mp3",
            "audio/flac" | "audio/x-flac" => "flac",
            "audio/ogg" | "application/ogg" => "ogg",
            "audio/aac" | "audio/x-aac" => "aac",
            "audio/aiff" | "audio/x-aiff" => "aiff",
            "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
            "audio/webm" | "video/webm" => "webm",
            "audio/amr" => "amr",
            "audio/opus" => "opus",
            _ => return None,
        };
        Some(ext.to_string())
    });

    from_mime.or_else(|| {
        file_name
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.trim().to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| if ext == "aif" { "aiff".to_string() } else { ext })
    })
}

pub fn is_supported(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}

/// MIME type sent to the model for a supported extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "wav" => "audio/wav",
        "mp3" => "audio/mp3",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "aac" => "audio/aac",
        "aiff" => "audio/aiff",
        _ => "application/octet-stream",
    }
}

#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Converts `bytes` (container hinted by `source_ext`) to PCM WAV.
    async fn to_wav(&self, bytes: &[u8], source_ext: &str) -> Result<Vec<u8>, TranscodeError>;
}

pub struct FfmpegTranscoder {
    binary: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn to_wav(&self, bytes: &[u8], source_ext: &str) -> Result<Vec<u8>, TranscodeError> {
        let work_dir: TempDir = tempfile::Builder::new().prefix("notes-audio-").tempdir()?;
        let input = work_dir.path().join(format!("input.{source_ext}"));
        let output = work_dir.path().join("output.wav");

        tokio::fs::write(&input, bytes).await?;

        let out = Command::new(&self.binary)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(&input)
            .args(["-ac", "1", "-ar", "16000", "-acodec", "pcm_s16le", "-f", "wav"])
            .arg(&output)
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(TranscodeError::Failed {
                status: out.status.to_string(),
                stderr: stderr.trim().chars().take(300).collect(),
            });
        }

        let wav = tokio::fs::read(&output).await?;
        work_dir.close()?;
        if wav.is_empty() {
            return Err(TranscodeError::EmptyOutput);
        }
        debug!(in_bytes = bytes.len(), out_bytes = wav.len(), "audio transcoded");
        Ok(wav)
    }
}

/// Passes supported formats through; converts the rest to WAV.
pub async fn prepare_audio(
    upload: AudioUpload,
    transcoder: &dyn AudioTranscoder,
) -> Result<PreparedAudio, TranscodeError> {
    let ext = resolve_extension(upload.mime_type.as_deref(), upload.file_name.as_deref())
        .unwrap_or_else(|| "bin".to_string());

    if is_supported(&ext) {
        return Ok(PreparedAudio {
            bytes: upload.bytes,
            mime_type: mime_for_extension(&ext).to_string(),
            transcoded: false,
        });
    }

    info!(source_ext = %ext, bytes = upload.bytes.len(), "converting unsupported audio to wav");
    let wav = transcoder.to_wav(&upload.bytes, &ext).await?;
    Ok(PreparedAudio {
        bytes: wav,
        mime_type: mime_for_extension("wav").to_string(),
        transcoded: true,
    })
}
