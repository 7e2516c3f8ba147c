mod common;

use common::{config_for, credentials, write_audio, TRANSCRIPTIONS_PATH};
use serde_json::json;
use std::time::Duration;
use vaani_voice::audio::packaging::WAV;
use vaani_voice::audio::{AudioPackager, AudioPayload};
use vaani_voice::error::ErrorKind;
use vaani_voice::transcription::TranscriptionClient;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn payload(dir: &std::path::Path) -> AudioPayload {
    let audio = write_audio(dir, "question.wav");
    AudioPackager::default()
        .package_file(&audio, WAV)
        .await
        .expect("package audio")
}

fn client(server: &MockServer, dir: &std::path::Path, auto_cleanup: bool) -> TranscriptionClient {
    let config = config_for(server, dir);
    TranscriptionClient::new(&config.transcription, &credentials(), auto_cleanup).expect("client")
}

#[tokio::test]
async fn transcribes_verbose_json_and_resolves_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .and(header("authorization", "Bearer sk-test-key"))
        .and(body_string_contains("whisper-1"))
        .and(body_string_contains("verbose_json"))
        .and(body_string_contains("question.wav"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": "transcribe",
            "language": "hindi",
            "duration": 4.5,
            "text": "  मी घरी आहे  "
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    let result = client(&server, dir.path(), false)
        .transcribe(&payload, None)
        .await
        .expect("transcription");

    assert_eq!(result.text, "मी घरी आहे");
    assert_eq!(result.raw_language_tag.as_deref(), Some("hindi"));
    // Supported upstream tag is trusted as-is
    assert_eq!(result.detected_language, "hi");
    assert_eq!(result.language_confidence, 0.9);
    assert_eq!(result.duration_seconds, Some(4.5));
    assert!(payload.source_path.exists());
}

#[tokio::test]
async fn missing_upstream_tag_falls_back_to_script_detection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "মই আৰু তুমি"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    let result = client(&server, dir.path(), false)
        .transcribe(&payload, None)
        .await
        .expect("transcription");

    assert_eq!(result.detected_language, "as");
    assert_eq!(result.language_confidence, 0.8);
}

#[tokio::test]
async fn forwards_language_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .and(body_string_contains("name=\"language\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "வணக்கம்", "language": "tamil"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    let result = client(&server, dir.path(), false)
        .transcribe(&payload, Some("ta"))
        .await
        .expect("transcription");
    assert_eq!(result.detected_language, "ta");
}

#[tokio::test]
async fn auto_cleanup_deletes_audio_after_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "hello there"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    client(&server, dir.path(), true)
        .transcribe(&payload, None)
        .await
        .expect("transcription");

    assert!(!payload.source_path.exists());
}

#[tokio::test]
async fn whitespace_transcript_is_no_speech() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": " \n\t ",
            "language": "hindi"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    let error = client(&server, dir.path(), true)
        .transcribe(&payload, None)
        .await
        .expect_err("no speech");

    assert_eq!(error.kind(), ErrorKind::NoSpeechDetected);
    // Only successful transcriptions clean up
    assert!(payload.source_path.exists());
}

#[tokio::test]
async fn unauthorized_is_invalid_key_not_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    let error = client(&server, dir.path(), false)
        .transcribe(&payload, None)
        .await
        .expect_err("unauthorized");

    assert_eq!(error.kind(), ErrorKind::TranscriptionFailed);
    assert_ne!(error.kind(), ErrorKind::NetworkError);
    assert!(error.to_string().contains("Invalid API key"));
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let cases = [
        (400, ErrorKind::TranscriptionFailed),
        (413, ErrorKind::InvalidAudio),
        (429, ErrorKind::TranscriptionFailed),
        (500, ErrorKind::NetworkError),
        (503, ErrorKind::NetworkError),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TRANSCRIPTIONS_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream said no"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let payload = payload(dir.path()).await;
        let error = client(&server, dir.path(), false)
            .transcribe(&payload, None)
            .await
            .expect_err("error status");
        assert_eq!(error.kind(), expected, "status {}", status);
    }
}

#[tokio::test]
async fn timeout_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"text": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config_for(&server, dir.path());
    config.transcription.timeout_secs = 1;
    let client = TranscriptionClient::new(&config.transcription, &credentials(), false).expect("client");
    let payload = payload(dir.path()).await;

    let error = client.transcribe(&payload, None).await.expect_err("timeout");
    assert_eq!(error.kind(), ErrorKind::NetworkError);
}

#[tokio::test]
async fn unparseable_success_body_is_transcription_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TRANSCRIPTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let payload = payload(dir.path()).await;
    let error = client(&server, dir.path(), false)
        .transcribe(&payload, None)
        .await
        .expect_err("bad body");
    assert_eq!(error.kind(), ErrorKind::TranscriptionFailed);
}
