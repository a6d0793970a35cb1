//! AI adapter: generative-model abstraction, the Gemini provider, and the
//! deterministic mock used by tests and `AI_TEST_MODE`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AiConfig;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Why a model call is made. Providers only use it for logs; the mock keys
/// its scripted replies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPurpose {
    LanguageDetection,
    SubjectDetection,
    NoteGeneration,
    LanguageValidation,
}

impl RequestPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestPurpose::LanguageDetection => "language_detection",
            RequestPurpose::SubjectDetection => "subject_detection",
            RequestPurpose::NoteGeneration => "note_generation",
            RequestPurpose::LanguageValidation => "language_validation",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded binary payload.
    InlineData { mime_type: String, data: String },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text(s.into())
    }

    pub fn inline_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        ContentPart::InlineData {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    pub fn from_config(cfg: &AiConfig) -> Self {
        Self {
            temperature: cfg.temperature,
            top_k: cfg.top_k,
            top_p: cfg.top_p,
            max_output_tokens: cfg.max_output_tokens,
        }
    }

    /// Short, near-deterministic answers for classification calls.
    pub fn classification() -> Self {
        Self {
            temperature: 0.0,
            top_k: 1,
            top_p: 1.0,
            max_output_tokens: 32,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_config(&AiConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub purpose: RequestPurpose,
    pub parts: Vec<ContentPart>,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(purpose: RequestPurpose, parts: Vec<ContentPart>, params: GenerationParams) -> Self {
        Self {
            purpose,
            parts,
            params,
        }
    }

    pub fn has_inline_data(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ContentPart::InlineData { .. }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub text: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI is disabled")]
    Disabled,
    #[error("missing API key for provider '{0}'")]
    MissingApiKey(&'static str),
    #[error("request to model failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("mock failure: {0}")]
    Mock(String),
}

/// Trait object used by the classifier and the engine.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, AiError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynModel = Arc<dyn GenerativeModel>;

/// Factory: build a model according to config and environment variables.
///
/// * `AI_TEST_MODE=mock` → deterministic mock.
/// * `AI_TEST_MODE=error` → mock failing every call.
/// * `enabled == false` → disabled client.
/// * otherwise the configured provider.
pub fn build_model_from_config(config: &AiConfig) -> DynModel {
    match std::env::var("AI_TEST_MODE").ok().as_deref() {
        Some("mock") => return Arc::new(MockProvider::new()),
        Some("error") => return Arc::new(MockProvider::failing("AI_TEST_MODE=error")),
        _ => {}
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "gemini" | "google" => match GeminiProvider::new(config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                warn!(error = %e, "gemini provider unavailable; AI disabled");
                Arc::new(DisabledClient)
            }
        },
        other => {
            warn!(provider = other, "unsupported AI provider; AI disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Gemini provider
// ------------------------------------------------------------

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent`. Requires `GEMINI_API_KEY`.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(cfg: &AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("study-notes-service/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Points the provider at another endpoint (proxies, local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Req<'a> {
        pub contents: Vec<Content<'a>>,
        pub generation_config: Config,
    }

    #[derive(Serialize)]
    pub struct Content<'a> {
        pub role: &'a str,
        pub parts: Vec<Part<'a>>,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub enum Part<'a> {
        Text(&'a str),
        InlineData(InlineData<'a>),
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InlineData<'a> {
        pub mime_type: &'a str,
        pub data: &'a str,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Config {
        pub temperature: f32,
        pub top_k: u32,
        pub top_p: f32,
        pub max_output_tokens: u32,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Resp {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
        #[serde(default)]
        pub usage_metadata: Option<Usage>,
    }

    #[derive(Deserialize)]
    pub struct Candidate {
        #[serde(default)]
        pub content: Option<RespContent>,
    }

    #[derive(Deserialize)]
    pub struct RespContent {
        #[serde(default)]
        pub parts: Vec<RespPart>,
    }

    #[derive(Deserialize)]
    pub struct RespPart {
        #[serde(default)]
        pub text: Option<String>,
    }

    #[derive(Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct Usage {
        #[serde(default)]
        pub prompt_token_count: u32,
        #[serde(default)]
        pub candidates_token_count: u32,
        #[serde(default)]
        pub total_token_count: u32,
    }
}

#[async_trait]
impl GenerativeModel for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::MissingApiKey("gemini"));
        }

        let parts = request
            .parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(t) => wire::Part::Text(t),
                ContentPart::InlineData { mime_type, data } => {
                    wire::Part::InlineData(wire::InlineData { mime_type, data })
                }
            })
            .collect();
        let body = wire::Req {
            contents: vec![wire::Content { role: "user", parts }],
            generation_config: wire::Config {
                temperature: request.params.temperature,
                top_k: request.params.top_k,
                top_p: request.params.top_p,
                max_output_tokens: request.params.max_output_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(purpose = request.purpose.as_str(), model = %self.model, "gemini request");

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: wire::Resp = resp.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }

        let usage = parsed.usage_metadata.unwrap_or_default();
        Ok(Generation {
            text,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
        })
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Disabled + mock clients
// ------------------------------------------------------------

/// Fails every call; used when AI is disabled.
pub struct DisabledClient;

#[async_trait]
impl GenerativeModel for DisabledClient {
    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, AiError> {
        Err(AiError::Disabled)
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    Text(String),
    /// Returns the last text part of the request unchanged.
    Echo,
    Fail(String),
}

/// Deterministic model for tests/local runs. Replies are scripted per
/// purpose; the n-th call of a purpose uses the n-th reply (the last reply
/// repeats). Every call is recorded.
pub struct MockProvider {
    replies: HashMap<RequestPurpose, Vec<MockReply>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

pub const MOCK_NOTES: &str = "# Study Notes\n\n## Key Points\n- Main idea of the material\n- Supporting details\n\n## Summary\nA short recap of the topic.";

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert(
            RequestPurpose::LanguageDetection,
            vec![MockReply::Text("English".into())],
        );
        replies.insert(
            RequestPurpose::SubjectDetection,
            vec![MockReply::Text("General".into())],
        );
        replies.insert(
            RequestPurpose::NoteGeneration,
            vec![MockReply::Text(MOCK_NOTES.into())],
        );
        replies.insert(RequestPurpose::LanguageValidation, vec![MockReply::Echo]);
        Self {
            replies,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every purpose fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        let mut mock = Self::new();
        for purpose in [
            RequestPurpose::LanguageDetection,
            RequestPurpose::SubjectDetection,
            RequestPurpose::NoteGeneration,
            RequestPurpose::LanguageValidation,
        ] {
            mock.replies
                .insert(purpose, vec![MockReply::Fail(reason.to_string())]);
        }
        mock
    }

    pub fn with_reply(mut self, purpose: RequestPurpose, reply: MockReply) -> Self {
        self.replies.insert(purpose, vec![reply]);
        self
    }

    pub fn with_replies(mut self, purpose: RequestPurpose, replies: Vec<MockReply>) -> Self {
        self.replies.insert(purpose, replies);
        self
    }

    pub fn with_text(self, purpose: RequestPurpose, text: &str) -> Self {
        self.with_reply(purpose, MockReply::Text(text.to_string()))
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, purpose: RequestPurpose) -> usize {
        self.calls()
            .iter()
            .filter(|r| r.purpose == purpose)
            .count()
    }
}

#[async_trait]
impl GenerativeModel for MockProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, AiError> {
        let nth = {
            let mut calls = self
                .calls
                .lock()
                .map_err(|_| AiError::Mock("call log poisoned".into()))?;
            let nth = calls.iter().filter(|r| r.purpose == request.purpose).count();
            calls.push(request.clone());
            nth
        };

        let reply = self
            .replies
            .get(&request.purpose)
            .and_then(|r| r.get(nth).or_else(|| r.last()))
            .cloned()
            .unwrap_or(MockReply::Fail("no scripted reply".into()));

        let text = match reply {
            MockReply::Text(t) => t,
            MockReply::Echo => request
                .parts
                .iter()
                .rev()
                .find_map(|p| match p {
                    ContentPart::Text(t) => Some(t.clone()),
                    ContentPart::InlineData { .. } => None,
                })
                .unwrap_or_default(),
            MockReply::Fail(reason) => return Err(AiError::Mock(reason)),
        };
        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }

        let prompt_chars: usize = request
            .parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(t) => t.len(),
                ContentPart::InlineData { data, .. } => data.len(),
            })
            .sum();
        let prompt_tokens = (prompt_chars / 4) as u32;
        let output_tokens = (text.len() / 4) as u32;
        Ok(Generation {
            text,
            usage: TokenUsage {
                prompt_tokens,
                output_tokens,
                total_tokens: prompt_tokens + output_tokens,
            },
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(purpose: RequestPurpose, text: &str) -> GenerationRequest {
        GenerationRequest::new(
            purpose,
            vec![ContentPart::text("instructions"), ContentPart::text(text)],
            GenerationParams::classification(),
        )
    }

    #[tokio::test]
    async fn disabled_client_always_errors() {
        let out = DisabledClient
            .generate(&req(RequestPurpose::NoteGeneration, "x"))
            .await;
        assert!(matches!(out, Err(AiError::Disabled)));
    }

    #[tokio::test]
    async fn mock_follows_script_and_repeats_last_reply() {
        let mock = MockProvider::new().with_replies(
            RequestPurpose::LanguageDetection,
            vec![MockReply::Text("unknown".into()), MockReply::Text("Tamil".into())],
        );
        let a = mock.generate(&req(RequestPurpose::LanguageDetection, "x")).await.unwrap();
        let b = mock.generate(&req(RequestPurpose::LanguageDetection, "x")).await.unwrap();
        let c = mock.generate(&req(RequestPurpose::LanguageDetection, "x")).await.unwrap();
        assert_eq!(a.text, "unknown");
        assert_eq!(b.text, "Tamil");
        assert_eq!(c.text, "Tamil");
        assert_eq!(mock.call_count(RequestPurpose::LanguageDetection), 3);
        assert_eq!(mock.call_count(RequestPurpose::NoteGeneration), 0);
    }

    #[tokio::test]
    async fn mock_echo_returns_last_text_part() {
        let mock = MockProvider::new();
        let out = mock
            .generate(&req(RequestPurpose::LanguageValidation, "notes body"))
            .await
            .unwrap();
        assert_eq!(out.text, "notes body");
        assert!(out.usage.total_tokens >= out.usage.output_tokens);
    }

    #[tokio::test]
    async fn failing_mock_fails_everything() {
        let mock = MockProvider::failing("boom");
        let out = mock.generate(&req(RequestPurpose::SubjectDetection, "x")).await;
        assert!(matches!(out, Err(AiError::Mock(ref r)) if r == "boom"));
    }

    #[test]
    fn inline_parts_are_base64() {
        let part = ContentPart::inline_bytes("audio/wav", b"RIFF");
        assert_eq!(
            part,
            ContentPart::InlineData {
                mime_type: "audio/wav".into(),
                data: "UklGRg==".into()
            }
        );
    }

    #[test]
    fn usage_adds_saturating() {
        let mut u = TokenUsage {
            prompt_tokens: u32::MAX,
            output_tokens: 1,
            total_tokens: 2,
        };
        u.add(TokenUsage {
            prompt_tokens: 5,
            output_tokens: 1,
            total_tokens: 1,
        });
        assert_eq!(u.prompt_tokens, u32::MAX);
        assert_eq!(u.output_tokens, 2);
        assert_eq!(u.total_tokens, 3);
    }
}
