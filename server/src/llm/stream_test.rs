use super::*;

fn interpret_plain(event: &SseEvent) -> Result<EventAction, LlmError> {
    match event.data.as_str() {
        "stop" => Ok(EventAction::Stop),
        "fail" => Err(LlmError::ApiStream("boom".into())),
        "" => Ok(EventAction::Skip),
        text => Ok(EventAction::Delta(text.to_owned())),
    }
}

fn chunks(parts: &[&'static str]) -> futures::stream::Iter<std::vec::IntoIter<Result<&'static [u8], String>>> {
    let items: Vec<Result<&'static [u8], String>> = parts.iter().map(|p| Ok(p.as_bytes())).collect();
    futures::stream::iter(items)
}

async fn collect(stream: DeltaStream) -> Vec<Result<String, String>> {
    stream
        .map(|item| item.map_err(|e| e.to_string()))
        .collect()
        .await
}

#[tokio::test]
async fn forwards_deltas_across_chunk_boundaries() {
    let stream = deltas_from_bytes(chunks(&["data: Hel", "\n\ndata: lo!\n", "\n"]), interpret_plain);
    assert_eq!(collect(stream).await, vec![Ok("Hel".to_string()), Ok("lo!".to_string())]);
}

#[tokio::test]
async fn stop_ends_stream_and_ignores_the_rest() {
    let stream = deltas_from_bytes(chunks(&["data: a\n\ndata: stop\n\ndata: b\n\n"]), interpret_plain);
    assert_eq!(collect(stream).await, vec![Ok("a".to_string())]);
}

#[tokio::test]
async fn trailing_event_without_delimiter_is_flushed() {
    let stream = deltas_from_bytes(chunks(&["data: a\n\ndata: tail"]), interpret_plain);
    assert_eq!(collect(stream).await, vec![Ok("a".to_string()), Ok("tail".to_string())]);
}

#[tokio::test]
async fn interpreter_error_terminates_stream() {
    let stream = deltas_from_bytes(chunks(&["data: a\n\ndata: fail\n\ndata: b\n\n"]), interpret_plain);
    let items = collect(stream).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Ok("a".to_string()));
    assert!(items[1].as_ref().unwrap_err().contains("boom"));
}

#[tokio::test]
async fn body_error_becomes_api_request_error() {
    let items: Vec<Result<&'static [u8], String>> = vec![Ok(b"data: a\n\n".as_slice()), Err("reset by peer".into())];
    let stream = deltas_from_bytes(futures::stream::iter(items), interpret_plain);
    let items = collect(stream).await;
    assert_eq!(items[0], Ok("a".to_string()));
    assert!(items[1].as_ref().unwrap_err().contains("reset by peer"));
    assert_eq!(items.len(), 2);
}
