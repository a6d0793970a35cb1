use std::sync::Arc;

use serial_test::serial;
use study_notes_service::ai_adapter::{
    build_model_from_config, AiError, ContentPart, DisabledClient, GenerationParams,
    GenerationRequest, GenerativeModel, MockProvider, RequestPurpose, MOCK_NOTES,
};
use study_notes_service::config::AiConfig;

fn request(purpose: RequestPurpose, text: &str) -> GenerationRequest {
    GenerationRequest::new(
        purpose,
        vec![ContentPart::text(text)],
        GenerationParams::classification(),
    )
}

#[tokio::test]
async fn disabled_client_always_errors() {
    let client = DisabledClient;
    let res = client
        .generate(&request(RequestPurpose::NoteGeneration, "hello"))
        .await;
    assert!(matches!(res, Err(AiError::Disabled)));
    assert_eq!(client.provider_name(), "disabled");
}

#[tokio::test]
#[serial]
async fn test_mode_mock_builds_deterministic_model() {
    std::env::set_var("AI_TEST_MODE", "mock");
    let model = build_model_from_config(&AiConfig::default());
    std::env::remove_var("AI_TEST_MODE");

    let out = model
        .generate(&request(RequestPurpose::NoteGeneration, "anything"))
        .await
        .expect("mock generation");
    assert_eq!(out.text, MOCK_NOTES);
}

#[tokio::test]
#[serial]
async fn test_mode_error_fails_every_call() {
    std::env::set_var("AI_TEST_MODE", "error");
    let model = build_model_from_config(&AiConfig::default());
    std::env::remove_var("AI_TEST_MODE");

    let res = model
        .generate(&request(RequestPurpose::LanguageDetection, "hola"))
        .await;
    assert!(res.is_err());
}

#[tokio::test]
#[serial]
async fn disabled_config_builds_disabled_client() {
    std::env::remove_var("AI_TEST_MODE");
    let cfg = AiConfig {
        enabled: false,
        ..AiConfig::default()
    };
    let model = build_model_from_config(&cfg);
    assert_eq!(model.provider_name(), "disabled");
}

#[tokio::test]
async fn mock_records_calls_in_order() {
    let mock = Arc::new(MockProvider::new());
    mock.generate(&request(RequestPurpose::LanguageDetection, "a"))
        .await
        .unwrap();
    mock.generate(&request(RequestPurpose::SubjectDetection, "b"))
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].purpose, RequestPurpose::LanguageDetection);
    assert_eq!(mock.call_count(RequestPurpose::SubjectDetection), 1);
}
