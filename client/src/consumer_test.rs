use std::time::Duration;

use frames::Role;
use futures::stream;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::state::{FAILURE_NOTICE, TurnPhase};

type Chunk = Result<Vec<u8>, std::io::Error>;

fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Chunk> {
    let owned: Vec<Chunk> = parts.iter().map(|part| Ok(part.to_vec())).collect();
    stream::iter(owned)
}

fn streaming_session() -> ChatSession {
    let session = ChatSession::new("gpt-4o-mini");
    session.begin_turn("Hi").unwrap();
    session.mark_streaming();
    session
}

fn reply(session: &ChatSession) -> String {
    session.snapshot().messages.last().unwrap().content.clone()
}

const HELLO_BODY: &str = "data: {\"content\":\"Hel\"}\n\ndata: {\"content\":\"lo!\"}\n\ndata: [DONE]\n\n";

// =============================================================================
// consume_stream: chunking
// =============================================================================

#[tokio::test]
async fn content_is_independent_of_chunking() {
    let body = HELLO_BODY.as_bytes();
    for split in 1..body.len() {
        let session = streaming_session();
        let outcome = consume_stream(chunks(&[&body[..split], &body[split..]]), &session, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Completed, "split at {split}");
        assert_eq!(reply(&session), "Hello!", "split at {split}");
    }
}

#[tokio::test]
async fn byte_at_a_time_body_with_multibyte_text() {
    let body = "data: {\"content\":\"h\u{e9}llo \u{1f600}\"}\n\ndata: [DONE]\n\n".as_bytes();
    let parts: Vec<&[u8]> = body.chunks(1).collect();
    let session = streaming_session();

    consume_stream(chunks(&parts), &session, &CancellationToken::new()).await.unwrap();
    assert_eq!(reply(&session), "h\u{e9}llo \u{1f600}");
}

#[tokio::test]
async fn several_frames_in_one_chunk() {
    let session = streaming_session();
    consume_stream(chunks(&[HELLO_BODY.as_bytes()]), &session, &CancellationToken::new()).await.unwrap();
    assert_eq!(reply(&session), "Hello!");
}

// =============================================================================
// consume_stream: events
// =============================================================================

#[tokio::test]
async fn malformed_frame_is_skipped() {
    let body: &[u8] = b"data: {\"content\":\"a\"}\n\ndata: {not json\n\ndata: {\"text\":\"x\"}\n\ndata: {\"content\":\"b\"}\n\ndata: [DONE]\n\n";
    let session = streaming_session();

    let outcome = consume_stream(chunks(&[body]), &session, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(reply(&session), "ab");
}

#[tokio::test]
async fn nothing_after_sentinel_is_applied() {
    let body: &[u8] = b"data: {\"content\":\"a\"}\n\ndata: [DONE]\n\ndata: {\"content\":\"late\"}\n\n";
    let session = streaming_session();

    consume_stream(chunks(&[body]), &session, &CancellationToken::new()).await.unwrap();
    assert_eq!(reply(&session), "a");
}

#[tokio::test]
async fn sentinel_stops_reading_the_body() {
    let head: Chunk = Ok(b"data: {\"content\":\"a\"}\n\ndata: [DONE]\n\n".to_vec());
    let body = stream::iter(vec![head]).chain(stream::pending());
    let session = streaming_session();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        consume_stream(body, &session, &CancellationToken::new()),
    )
    .await
    .expect("consumer kept reading after the sentinel")
    .unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);
}

#[tokio::test]
async fn end_of_body_without_sentinel_flushes_trailing_event() {
    let body: &[u8] = b"data: {\"content\":\"a\"}\n\ndata: {\"content\":\"b\"}";
    let session = streaming_session();

    let outcome = consume_stream(chunks(&[body]), &session, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);
    assert_eq!(reply(&session), "ab");
}

#[tokio::test]
async fn read_error_keeps_applied_fragments() {
    let items: Vec<Chunk> = vec![
        Ok(b"data: {\"content\":\"par\"}\n\n".to_vec()),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        Ok(b"data: {\"content\":\"never\"}\n\n".to_vec()),
    ];
    let session = streaming_session();

    let err = consume_stream(stream::iter(items), &session, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Body(_)));
    assert_eq!(reply(&session), "par");
}

#[tokio::test]
async fn cancellation_mid_stream_keeps_partial_content() {
    let head: Chunk = Ok(b"data: {\"content\":\"par\"}\n\n".to_vec());
    let body = stream::iter(vec![head]).chain(stream::pending());
    let session = streaming_session();
    let cancel = CancellationToken::new();

    let mut rx = session.subscribe();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        rx.wait_for(|state| state.messages.last().is_some_and(|m| !m.content.is_empty()))
            .await
            .unwrap();
        trigger.cancel();
    });

    let outcome = consume_stream(body, &session, &cancel).await.unwrap();
    watcher.await.unwrap();
    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert_eq!(reply(&session), "par");
}

// =============================================================================
// run_turn against a fake relay
// =============================================================================

#[tokio::test]
async fn run_turn_streams_reply_into_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(serde_json::json!({
            "messages": [{ "role": "user", "content": "Hi" }],
            "model": "gpt-4o-mini"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_BODY, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri()).unwrap();
    let session = ChatSession::new("gpt-4o-mini");

    let outcome = client.run_turn(&session, "Hi", &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Completed);

    let state = session.snapshot();
    assert_eq!(state.phase, TurnPhase::Completed);
    assert_eq!(state.messages.len(), 2);
    assert_eq!(state.messages[1].role, Role::Assistant);
    assert_eq!(state.messages[1].content, "Hello!");
    assert!(state.notice.is_none());
}

#[tokio::test]
async fn run_turn_error_status_fails_with_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "message": "An error occurred during your request." }
        })))
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri()).unwrap();
    let session = ChatSession::new("gpt-4o-mini");

    let outcome = client.run_turn(&session, "Hi", &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Failed);

    let state = session.snapshot();
    assert_eq!(state.phase, TurnPhase::Failed);
    assert!(!state.is_loading());
    assert_eq!(state.notice.as_deref(), Some(FAILURE_NOTICE));
    assert_eq!(state.messages[1].content, "");
}

#[tokio::test]
async fn run_turn_cancelled_while_waiting_for_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_BODY, "text/event-stream").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let client = ChatClient::new(&server.uri()).unwrap();
    let session = ChatSession::new("gpt-4o-mini");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = client.run_turn(&session, "Hi", &cancel).await.unwrap();
    assert_eq!(outcome, TurnOutcome::Cancelled);
    assert_eq!(session.snapshot().phase, TurnPhase::Cancelled);
    assert!(session.snapshot().notice.is_none());
}

#[tokio::test]
async fn run_turn_rejects_blank_input_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let client = ChatClient::new(&server.uri()).unwrap();
    let session = ChatSession::new("gpt-4o-mini");

    let err = client.run_turn(&session, "  ", &CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, ChatError::EmptyInput);
}

#[test]
fn endpoint_joins_base_url() {
    let client = ChatClient::new("http://localhost:3000/").unwrap();
    assert_eq!(client.endpoint(), "http://localhost:3000/api/chat");
}
