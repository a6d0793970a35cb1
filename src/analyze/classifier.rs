//! Model classifier: single-answer calls for language name and subject label.
//!
//! Failures never propagate. Language falls back to `unknown`, subject to
//! "no mapping" (`None`).

use tracing::{debug, warn};

use crate::analyze::ai_adapter::{
    ContentPart, DynModel, GenerationParams, GenerationRequest, RequestPurpose,
};
use crate::analyze::mentions_label;
use crate::language::{has_markdown_artifacts, normalize_model_text, truncate_chars, LanguageName};
use crate::subject::{synonym_for, SubjectLabel};

/// Characters of input shown to the model for language detection.
pub const LANGUAGE_SAMPLE_CHARS: usize = 500;
/// Shortest answer accepted for "answer inside label" containment.
const MIN_CONTAINED_ANSWER_CHARS: usize = 3;

/// Language answer plus whether the raw reply carried markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageAnswer {
    pub language: LanguageName,
    pub had_markdown: bool,
}

pub struct ModelClassifier {
    model: DynModel,
}

impl ModelClassifier {
    pub fn new(model: DynModel) -> Self {
        Self { model }
    }

    /// Asks for the language of (the first 500 chars of) `text`.
    pub async fn detect_language(&self, text: &str) -> LanguageAnswer {
        let sample = truncate_chars(text.trim(), LANGUAGE_SAMPLE_CHARS);
        if sample.is_empty() {
            return LanguageAnswer {
                language: LanguageName::unknown(),
                had_markdown: false,
            };
        }

        let instruction = "Identify the natural language of the text below. \
             Reply with only the language name in English (for example: English, Tamil, Spanish). \
             Do not add punctuation, quotes, formatting or explanations.";
        let request = GenerationRequest::new(
            RequestPurpose::LanguageDetection,
            vec![ContentPart::text(instruction), ContentPart::text(sample)],
            GenerationParams::classification(),
        );

        match self.model.generate(&request).await {
            Ok(out) => {
                let language = LanguageName::from_model_answer(&out.text);
                debug!(language = %language, "language detected");
                LanguageAnswer {
                    language,
                    had_markdown: has_markdown_artifacts(&out.text),
                }
            }
            Err(e) => {
                warn!(error = %e, "language detection failed; using 'unknown'");
                metrics::counter!("ai_call_failures_total", "purpose" => "language_detection")
                    .increment(1);
                LanguageAnswer {
                    language: LanguageName::unknown(),
                    had_markdown: false,
                }
            }
        }
    }

    /// Asks for exactly one label from the closed set for `excerpt`.
    pub async fn detect_subject(&self, excerpt: &str) -> Option<SubjectLabel> {
        if excerpt.trim().is_empty() {
            return None;
        }

        let instruction = format!(
            "Classify the academic subject of the study material below. \
             Answer with exactly one label from this list and nothing else: {}.",
            SubjectLabel::allowed_list()
        );
        let request = GenerationRequest::new(
            RequestPurpose::SubjectDetection,
            vec![ContentPart::text(instruction), ContentPart::text(excerpt)],
            GenerationParams::classification(),
        );

        match self.model.generate(&request).await {
            Ok(out) => {
                let mapped = map_model_answer(&out.text);
                if mapped.is_none() {
                    debug!(
                        answer = %truncate_chars(&out.text, 60),
                        "subject answer has no mapping"
                    );
                }
                mapped
            }
            Err(e) => {
                warn!(error = %e, "subject detection failed; no mapping");
                metrics::counter!("ai_call_failures_total", "purpose" => "subject_detection")
                    .increment(1);
                None
            }
        }
    }
}

/// Maps a raw model answer onto the closed label set: exact match, then
/// containment, then the synonym table.
pub fn map_model_answer(raw: &str) -> Option<SubjectLabel> {
    let answer = normalize_model_text(raw);
    if answer.is_empty() {
        return None;
    }
    let lower = answer.to_lowercase();

    // (1) exact
    if let Ok(label) = answer.parse::<SubjectLabel>() {
        return Some(label);
    }

    // (2) containment: "Biochemistry" ⊇ "chemistry"; "comput" ⊆ "computer science"
    let by_containment = SubjectLabel::ALL.iter().copied().find(|label| {
        mentions_label(&lower, *label)
            || (lower.chars().count() >= MIN_CONTAINED_ANSWER_CHARS
                && label.as_str().to_lowercase().contains(&lower))
    });
    if by_containment.is_some() {
        return by_containment;
    }

    // (3) synonyms
    synonym_for(&lower)
}
