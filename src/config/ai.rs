// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_top_k() -> u32 {
    32
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    8192
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "gemini" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Sampling parameters for note generation. Classification calls use
    /// fixed low-temperature settings.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        cfg.finalize()
    }

    /// `AI_CONFIG_PATH` (or `config/ai.json`) when the file exists, otherwise
    /// defaults with the key taken from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = env::var(ENV_AI_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.into());
        if Path::new(&path).exists() {
            return Self::load_from_file(&path);
        }
        let mut cfg = AiConfig::default();
        if let Ok(model) = env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                cfg.model = model.trim().to_string();
            }
        }
        cfg.finalize()
    }

    fn finalize(mut self) -> anyhow::Result<Self> {
        // Normalize provider
        self.provider = self.provider.trim().to_lowercase();

        // Resolve api key if "ENV". A missing key is not fatal here: the
        // provider reports it on first use and the service still serves notes CRUD.
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "gemini" | "google" => env::var("GEMINI_API_KEY")
                    .or_else(|_| env::var("GOOGLE_API_KEY"))
                    .unwrap_or_default(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        self.sanitize();
        Ok(self)
    }

    fn sanitize(&mut self) {
        let defaults = AiConfig::default();
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = defaults.temperature;
        }
        if !(0.0..=1.0).contains(&self.top_p) || self.top_p == 0.0 {
            self.top_p = defaults.top_p;
        }
        if self.top_k == 0 {
            self.top_k = defaults.top_k;
        }
        if self.max_output_tokens == 0 {
            self.max_output_tokens = defaults.max_output_tokens;
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = defaults.timeout_secs;
        }
    }
}
