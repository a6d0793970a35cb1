// tests/pipeline_e2e.rs
//
// Detection pipeline through the public library API: keyword scoring,
// reconciliation, and the full NoteGenerator with a scripted model.

use std::sync::Arc;

use study_notes_service::ai_adapter::{GenerationParams, MockProvider, MockReply, RequestPurpose};
use study_notes_service::analyze::{reconcile, score_subjects, DecisionSource, RecheckRule};
use study_notes_service::engine::{NoteGenerator, NoteInput};
use study_notes_service::lexicon::{Lexicon, LexiconScope};
use study_notes_service::store::{InMemoryNoteStore, NoteStore};
use study_notes_service::subject::SubjectLabel;

const SPORTS_TEXT: &str = "The football match was tense: the referee added time and the \
                           tournament final was settled by a late goal.";

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

#[test]
fn reconciler_is_closed_over_the_label_set() {
    let lexicon = Lexicon::builtin();
    for text in ["", "   ", SPORTS_TEXT, "Mitochondria produce ATP.", "zzz qqq"] {
        let scores = score_subjects(text, &lexicon, LexiconScope::Full);
        for model in SubjectLabel::ALL.iter().copied().map(Some).chain([None]) {
            let decision = reconcile(&scores, model);
            assert!(SubjectLabel::ALL.contains(&decision.subject));
        }
    }
}

#[test]
fn blank_input_scores_zero_and_falls_back_to_general() {
    let lexicon = Lexicon::builtin();
    let scores = score_subjects(" \n\t ", &lexicon, LexiconScope::Full);
    assert!(scores.is_all_zero());
    let decision = reconcile(&scores, None);
    assert_eq!(decision.subject, SubjectLabel::General);
    assert_eq!(decision.source, DecisionSource::Default);
}

#[test]
fn scoring_is_idempotent() {
    let lexicon = Lexicon::builtin();
    let a = score_subjects(SPORTS_TEXT, &lexicon, LexiconScope::Full);
    let b = score_subjects(SPORTS_TEXT, &lexicon, LexiconScope::Full);
    assert_eq!(a, b);
    assert!(a.score(SubjectLabel::Sports) >= 5);
}

#[tokio::test]
async fn keyword_evidence_overrides_model_label_end_to_end() {
    let mock = MockProvider::new().with_text(RequestPurpose::SubjectDetection, "Programming");
    let (gen, _, store) = generator(mock);

    let out = gen
        .generate(NoteInput::Text(SPORTS_TEXT.into()))
        .await
        .expect("generation");

    assert_eq!(out.pre_generation.subject, SubjectLabel::Sports);
    assert_eq!(out.pre_generation.source, DecisionSource::HeuristicOverride);
    assert_eq!(out.subject, SubjectLabel::Sports);
    assert_eq!(store.find_all().await.unwrap()[0].detected_subject, SubjectLabel::Sports);
}

#[tokio::test]
async fn loose_model_answer_maps_through_synonyms() {
    let mock = MockProvider::new().with_text(RequestPurpose::SubjectDetection, "**Maths**");
    let (gen, _, _) = generator(mock);
    let out = gen
        .generate(NoteInput::Text("Notes from today's class.".into()))
        .await
        .unwrap();
    assert_eq!(out.pre_generation.subject, SubjectLabel::Mathematics);
    assert_eq!(out.pre_generation.source, DecisionSource::Model);
}

#[tokio::test]
async fn generated_text_mentioning_a_subject_wins_the_recheck() {
    let mock = MockProvider::new()
        .with_text(RequestPurpose::SubjectDetection, "History")
        .with_text(
            RequestPurpose::NoteGeneration,
            "# Chemistry of everyday life\n- why bread rises",
        );
    let (gen, _, _) = generator(mock);
    let out = gen
        .generate(NoteInput::Text("Class notes, week 3.".into()))
        .await
        .unwrap();
    assert_eq!(out.subject, SubjectLabel::Chemistry);
    assert_eq!(out.recheck.rule, RecheckRule::LabelMention);
}

#[tokio::test]
async fn validation_output_replaces_generated_notes() {
    let mock = MockProvider::new()
        .with_text(RequestPurpose::LanguageDetection, "Spanish")
        .with_text(RequestPurpose::NoteGeneration, "# Notes in the wrong language")
        .with_text(RequestPurpose::LanguageValidation, "# Apuntes en español");
    let (gen, mock, _) = generator(mock);
    let out = gen
        .generate(NoteInput::Text("La célula es la unidad básica de la vida.".into()))
        .await
        .unwrap();

    assert!(out.validated);
    assert_eq!(out.notes, "# Apuntes en español");
    assert_eq!(out.language.as_str(), "Spanish");

    let validation = mock
        .calls()
        .into_iter()
        .find(|c| c.purpose == RequestPurpose::LanguageValidation)
        .expect("validation call");
    let prompt = match &validation.parts[0] {
        study_notes_service::ai_adapter::ContentPart::Text(t) => t.clone(),
        _ => panic!("prompt part should be text"),
    };
    assert!(prompt.contains("entirely in Spanish"));
}

#[tokio::test]
async fn empty_validation_answer_keeps_notes() {
    let mock = MockProvider::new()
        .with_text(RequestPurpose::NoteGeneration, "# Original notes")
        .with_reply(RequestPurpose::LanguageValidation, MockReply::Text("   ".into()));
    let (gen, _, _) = generator(mock);
    let out = gen.generate(NoteInput::Text("hello".into())).await.unwrap();
    assert!(!out.validated);
    assert_eq!(out.notes, "# Original notes");
}

#[tokio::test]
async fn markdown_language_answer_is_retried() {
    let mock = MockProvider::new().with_replies(
        RequestPurpose::LanguageDetection,
        vec![
            MockReply::Text("**German**".into()),
            MockReply::Text("German".into()),
        ],
    );
    let (gen, mock, _) = generator(mock);
    let out = gen
        .generate(NoteInput::Text("Die Zelle ist die kleinste Einheit des Lebens.".into()))
        .await
        .unwrap();
    assert_eq!(out.language.as_str(), "German");
    assert_eq!(mock.call_count(RequestPurpose::LanguageDetection), 2);
}
