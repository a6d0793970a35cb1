//! # Note Generation Engine
//! Runs one request through the pipeline, strictly in order:
//! language detection (with a single retry), subject reconciliation,
//! prompt assembly, generation, language validation, subject re-check and
//! persistence.
//!
//! Only the generation call is fatal. Detection, validation and persistence
//! failures degrade to defaults and are logged.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analyze::ai_adapter::{
    AiError, ContentPart, DynModel, GenerationParams, GenerationRequest, RequestPurpose,
    TokenUsage,
};
use crate::analyze::{
    format_excerpt, recheck_subject, reconcile, score_subjects, DecisionSource, ModelClassifier,
    RecheckOutcome, SubjectDecision,
};
use crate::analyze::prompt::{generation_prompt, validation_prompt};
use crate::audio::PreparedAudio;
use crate::error::GenerationError;
use crate::language::{presumed_non_english, LanguageName};
use crate::lexicon::{Lexicon, LexiconScope};
use crate::store::{DynStore, InputType, NewNote, NoteRecord};
use crate::subject::SubjectLabel;
use crate::telemetry::anon_hash;

#[derive(Debug, Clone)]
pub enum NoteInput {
    Text(String),
    Audio {
        audio: PreparedAudio,
        /// Stored as the note's original content.
        file_name: String,
    },
}

impl NoteInput {
    pub fn input_type(&self) -> InputType {
        match self {
            NoteInput::Text(_) => InputType::Text,
            NoteInput::Audio { .. } => InputType::Audio,
        }
    }
}

/// Everything the caller needs to answer the request.
#[derive(Debug, Clone, Serialize)]
pub struct NoteOutcome {
    pub notes: String,
    /// Effective language (English when detection failed).
    pub language: LanguageName,
    pub subject: SubjectLabel,
    pub input_type: InputType,
    pub usage: TokenUsage,
    pub pre_generation: SubjectDecision,
    pub recheck: RecheckOutcome,
    /// Whether the validation pass replaced the generated notes.
    pub validated: bool,
    pub record: Option<NoteRecord>,
}

impl NoteOutcome {
    pub fn note_id(&self) -> Option<uuid::Uuid> {
        self.record.as_ref().map(|r| r.id)
    }

    pub fn saved(&self) -> bool {
        self.record.is_some()
    }
}

pub struct NoteGenerator {
    model: DynModel,
    classifier: ModelClassifier,
    lexicon: Arc<Lexicon>,
    params: GenerationParams,
    store: DynStore,
}

impl NoteGenerator {
    pub fn new(
        model: DynModel,
        lexicon: Arc<Lexicon>,
        params: GenerationParams,
        store: DynStore,
    ) -> Self {
        Self {
            classifier: ModelClassifier::new(model.clone()),
            model,
            lexicon,
            params,
            store,
        }
    }

    pub async fn generate(&self, input: NoteInput) -> Result<NoteOutcome, GenerationError> {
        let input_type = input.input_type();
        let (source_text, original_content) = match &input {
            NoteInput::Text(t) => {
                if t.trim().is_empty() {
                    return Err(GenerationError::EmptyInput);
                }
                (t.as_str(), t.clone())
            }
            NoteInput::Audio { audio, file_name } => {
                if audio.bytes.is_empty() {
                    return Err(GenerationError::EmptyInput);
                }
                ("", file_name.clone())
            }
        };
        let id = anon_hash(&original_content);
        let mut usage = TokenUsage::default();

        // 1) language
        let mut language = if source_text.is_empty() {
            LanguageName::unknown()
        } else {
            self.detect_language_with_retry(source_text).await
        };

        // 2) subject
        let scores = score_subjects(source_text, &self.lexicon, LexiconScope::Full);
        let model_label = self
            .classifier
            .detect_subject(&format_excerpt(source_text))
            .await;
        let pre = reconcile(&scores, model_label);
        if pre.source == DecisionSource::HeuristicOverride {
            metrics::counter!("subject_override_total", "stage" => "pre").increment(1);
        }
        debug!(
            %id,
            subject = %pre.subject,
            source = ?pre.source,
            nonzero = ?scores.nonzero(),
            "subject reconciled"
        );

        // 3) prompt
        let prompt_target = if source_text.is_empty() {
            language.clone()
        } else {
            language.or_english()
        };
        let prompt = generation_prompt(&prompt_target, pre.subject, input_type == InputType::Audio);

        // 4) generate
        let payload = match &input {
            NoteInput::Text(t) => ContentPart::text(t.clone()),
            NoteInput::Audio { audio, .. } => {
                ContentPart::inline_bytes(audio.mime_type.clone(), &audio.bytes)
            }
        };
        let request = GenerationRequest::new(
            RequestPurpose::NoteGeneration,
            vec![ContentPart::text(prompt), payload],
            self.params,
        );
        let generated = match self.model.generate(&request).await {
            Ok(g) if !g.text.trim().is_empty() => g,
            Ok(_) => return Err(GenerationError::Model(AiError::EmptyResponse)),
            Err(e) => {
                metrics::counter!("ai_call_failures_total", "purpose" => "note_generation")
                    .increment(1);
                warn!(%id, error = %e, "note generation failed");
                return Err(GenerationError::Model(e));
            }
        };
        usage.add(generated.usage);
        let mut notes = generated.text;

        // Audio has no text to inspect before generation.
        if language.is_unknown() && input_type == InputType::Audio {
            language = self.detect_language_with_retry(&notes).await;
        }
        let target = language.or_english();

        // 5) validate
        let validated = match self.validate_language(&notes, &target).await {
            Some(v) => {
                usage.add(v.1);
                notes = v.0;
                true
            }
            None => false,
        };

        // 6) re-check
        let recheck = recheck_subject(&notes, source_text, pre.subject, &self.lexicon);
        if recheck.changed_from(pre.subject) {
            metrics::counter!("subject_override_total", "stage" => "post").increment(1);
            info!(
                %id,
                from = %pre.subject,
                to = %recheck.subject,
                rule = ?recheck.rule,
                "subject revised after generation"
            );
        }

        // 7) persist
        let record = self
            .persist(NewNote {
                input_type,
                generated_notes: notes.clone(),
                detected_language: target.clone(),
                detected_subject: recheck.subject,
                original_content,
            })
            .await;

        metrics::counter!("notes_generated_total").increment(1);
        info!(
            %id,
            input_type = %input_type,
            language = %target,
            subject = %recheck.subject,
            saved = record.is_some(),
            total_tokens = usage.total_tokens,
            "notes generated"
        );

        Ok(NoteOutcome {
            notes,
            language: target,
            subject: recheck.subject,
            input_type,
            usage,
            pre_generation: pre,
            recheck,
            validated,
            record,
        })
    }

    /// One detection, plus a single retry when the first answer is unusable
    /// or implausible for the input.
    async fn detect_language_with_retry(&self, text: &str) -> LanguageName {
        let first = self.classifier.detect_language(text).await;
        let implausible_english = first.language.mentions_english() && presumed_non_english(text);
        if !(first.language.is_unknown() || implausible_english || first.had_markdown) {
            return first.language;
        }

        metrics::counter!("language_retry_total").increment(1);
        debug!(
            first = %first.language,
            implausible_english,
            markdown = first.had_markdown,
            "retrying language detection"
        );
        let second = self.classifier.detect_language(text).await;
        if second.language.is_unknown() {
            first.language
        } else {
            second.language
        }
    }

    /// Rewrites `notes` strictly in `target`. `None` keeps the originals.
    async fn validate_language(
        &self,
        notes: &str,
        target: &LanguageName,
    ) -> Option<(String, TokenUsage)> {
        let request = GenerationRequest::new(
            RequestPurpose::LanguageValidation,
            vec![
                ContentPart::text(validation_prompt(target)),
                ContentPart::text(notes),
            ],
            self.params,
        );
        match self.model.generate(&request).await {
            Ok(out) if !out.text.trim().is_empty() => Some((out.text, out.usage)),
            Ok(_) => {
                warn!("language validation returned nothing; keeping generated notes");
                None
            }
            Err(e) => {
                metrics::counter!("ai_call_failures_total", "purpose" => "language_validation")
                    .increment(1);
                warn!(error = %e, "language validation failed; keeping generated notes");
                None
            }
        }
    }

    async fn persist(&self, note: NewNote) -> Option<NoteRecord> {
        let result = match self.store.ensure_connected().await {
            Ok(()) => self.store.save(note).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(record) => {
                metrics::counter!("notes_saved_total").increment(1);
                Some(record)
            }
            Err(e) => {
                metrics::counter!("notes_unsaved_total").increment(1);
                warn!(backend = self.store.backend(), error = %e, "note not persisted");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::ai_adapter::{MockProvider, MockReply};
    use crate::analyze::RecheckRule;
    use crate::store::{InMemoryNoteStore, NoteStore};

    fn generator(mock: MockProvider) -> (NoteGenerator, Arc<MockProvider>, Arc<InMemoryNoteStore>) {
        let mock = Arc::new(mock);
        let store = Arc::new(InMemoryNoteStore::new());
        let gen = NoteGenerator::new(
            mock.clone(),
            Lexicon::builtin(),
            GenerationParams::default(),
            store.clone(),
        );
        (gen, mock, store)
    }

    #[tokio::test]
    async fn empty_text_is_rejected_before_any_call() {
        let (gen, mock, _) = generator(MockProvider::new());
        let err = gen.generate(NoteInput::Text("  \n ".into())).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyInput));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn biology_text_end_to_end() {
        let mock = MockProvider::new()
            .with_text(RequestPurpose::LanguageDetection, "English")
            .with_text(RequestPurpose::SubjectDetection, "Biology");
        let (gen, _, store) = generator(mock);
        let out = gen
            .generate(NoteInput::Text(
                "Mitochondria produce ATP through cellular respiration.".into(),
            ))
            .await
            .unwrap();
        assert_eq!(out.subject, SubjectLabel::Biology);
        assert_eq!(out.language, LanguageName::english());
        assert!(out.saved());
        assert_eq!(store.len(), 1);
        let saved = store.find_by_id(out.note_id().unwrap()).await.unwrap().unwrap();
        assert_eq!(saved.detected_subject, SubjectLabel::Biology);
    }

    #[tokio::test]
    async fn unknown_language_is_retried_once() {
        let mock = MockProvider::new().with_replies(
            RequestPurpose::LanguageDetection,
            vec![MockReply::Text("???".into()), MockReply::Text("Tamil".into())],
        );
        let (gen, mock, _) = generator(mock);
        let out = gen.generate(NoteInput::Text("வணக்கம் உலகம்".into())).await.unwrap();
        assert_eq!(out.language.as_str(), "Tamil");
        assert_eq!(mock.call_count(RequestPurpose::LanguageDetection), 2);
    }

    #[tokio::test]
    async fn english_answer_for_non_latin_text_triggers_retry() {
        let mock = MockProvider::new().with_replies(
            RequestPurpose::LanguageDetection,
            vec![MockReply::Text("English".into()), MockReply::Text("Hindi".into())],
        );
        let (gen, mock, _) = generator(mock);
        let out = gen.generate(NoteInput::Text("नमस्ते दुनिया".into())).await.unwrap();
        assert_eq!(out.language.as_str(), "Hindi");
        assert_eq!(mock.call_count(RequestPurpose::LanguageDetection), 2);
    }

    #[tokio::test]
    async fn unknown_retry_keeps_first_answer_and_targets_english() {
        let mock = MockProvider::new()
            .with_reply(RequestPurpose::LanguageDetection, MockReply::Fail("quota".into()));
        let (gen, mock, _) = generator(mock);
        let out = gen.generate(NoteInput::Text("some notes".into())).await.unwrap();
        assert_eq!(out.language, LanguageName::english());
        assert_eq!(mock.call_count(RequestPurpose::LanguageDetection), 2);
    }

    #[tokio::test]
    async fn generation_failure_is_fatal() {
        let mock = MockProvider::new()
            .with_reply(RequestPurpose::NoteGeneration, MockReply::Fail("boom".into()));
        let (gen, _, store) = generator(mock);
        let err = gen.generate(NoteInput::Text("hello".into())).await.unwrap_err();
        assert!(matches!(err, GenerationError::Model(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn validation_failure_keeps_generated_notes() {
        let mock = MockProvider::new()
            .with_text(RequestPurpose::NoteGeneration, "# Notes\n- first")
            .with_reply(RequestPurpose::LanguageValidation, MockReply::Fail("down".into()));
        let (gen, _, _) = generator(mock);
        let out = gen.generate(NoteInput::Text("hello".into())).await.unwrap();
        assert_eq!(out.notes, "# Notes\n- first");
        assert!(!out.validated);
    }

    #[tokio::test]
    async fn post_generation_mention_revises_subject() {
        let mock = MockProvider::new()
            .with_text(RequestPurpose::SubjectDetection, "Physics")
            .with_text(RequestPurpose::NoteGeneration, "# Notes on organic Chemistry\n- bonds");
        let (gen, _, store) = generator(mock);
        let out = gen
            .generate(NoteInput::Text("A short lecture transcript.".into()))
            .await
            .unwrap();
        assert_eq!(out.pre_generation.subject, SubjectLabel::Physics);
        assert_eq!(out.subject, SubjectLabel::Chemistry);
        assert_eq!(out.recheck.rule, RecheckRule::LabelMention);
        let saved = store.find_all().await.unwrap();
        assert_eq!(saved[0].detected_subject, SubjectLabel::Chemistry);
    }

    #[tokio::test]
    async fn store_down_still_returns_notes() {
        let mock = Arc::new(MockProvider::new());
        let store = Arc::new(InMemoryNoteStore::unavailable());
        let gen = NoteGenerator::new(
            mock,
            Lexicon::builtin(),
            GenerationParams::default(),
            store.clone(),
        );
        let out = gen.generate(NoteInput::Text("hello".into())).await.unwrap();
        assert!(!out.saved());
        assert_eq!(out.note_id(), None);
        assert!(!out.notes.is_empty());
    }

    #[tokio::test]
    async fn audio_detects_language_from_generated_notes() {
        let mock = MockProvider::new()
            .with_text(RequestPurpose::LanguageDetection, "Spanish")
            .with_text(RequestPurpose::NoteGeneration, "# Apuntes\n- la fotosíntesis");
        let (gen, mock, store) = generator(mock);
        let out = gen
            .generate(NoteInput::Audio {
                audio: PreparedAudio {
                    bytes: b"RIFF....".to_vec(),
                    mime_type: "audio/wav".into(),
                    transcoded: false,
                },
                file_name: "lecture.wav".into(),
            })
            .await
            .unwrap();
        assert_eq!(out.input_type, InputType::Audio);
        assert_eq!(out.language.as_str(), "Spanish");

        let calls = mock.calls();
        let gen_call = calls
            .iter()
            .find(|c| c.purpose == RequestPurpose::NoteGeneration)
            .unwrap();
        assert!(gen_call.has_inline_data());
        // No excerpt to classify before generation.
        assert_eq!(mock.call_count(RequestPurpose::SubjectDetection), 0);

        let saved = store.find_all().await.unwrap();
        assert_eq!(saved[0].original_content, "lecture.wav");
    }
}
