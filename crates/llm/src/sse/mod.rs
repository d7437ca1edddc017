pub(crate) mod parser;

use std::convert::Infallible;

use axum::{
    http::{HeaderValue, header},
    response::{
        IntoResponse, Response, Sse,
        sse::Event,
    },
};
use futures::{Stream, StreamExt, stream};

use crate::{error::ErrorEnvelope, provider::ChatCompletionStream};

pub(crate) const DONE_SENTINEL: &str = "[DONE]";

/// Frame a provider chunk stream into SSE data payloads.
///
/// Chunks are emitted in arrival order. The first stream error becomes a
/// single error event (the 200 status is already on the wire at that point),
/// after which the stream closes. Every stream, successful or not, ends with
/// the literal `[DONE]` sentinel.
pub(crate) fn frame_data(chunks: ChatCompletionStream) -> impl Stream<Item = String> + Send {
    enum State {
        Streaming(ChatCompletionStream),
        Finishing,
        Closed,
    }

    stream::unfold(State::Streaming(chunks), |state| async move {
        match state {
            State::Streaming(mut chunks) => match chunks.next().await {
                Some(Ok(chunk)) => {
                    let data = sonic_rs::to_string(&chunk).unwrap_or_else(|e| {
                        log::error!("failed to serialize streaming chunk: {e}");
                        fallback_error_data()
                    });
                    Some((data, State::Streaming(chunks)))
                }
                Some(Err(e)) => {
                    log::error!("stream failed after response started: {e}");
                    let data = sonic_rs::to_string(&ErrorEnvelope::from(&e))
                        .unwrap_or_else(|_| fallback_error_data());
                    Some((data, State::Finishing))
                }
                None => Some((DONE_SENTINEL.to_string(), State::Closed)),
            },
            State::Finishing => Some((DONE_SENTINEL.to_string(), State::Closed)),
            State::Closed => None,
        }
    })
}

fn fallback_error_data() -> String {
    r#"{"error":{"type":"internal_error","message":"serialization failed"}}"#.to_string()
}

/// Wrap a provider chunk stream as a `text/event-stream` response.
pub(crate) fn chunk_stream_response(chunks: ChatCompletionStream) -> Response {
    let events = frame_data(chunks).map(|data| Ok::<_, Infallible>(Event::default().data(data)));

    let mut response = Sse::new(events).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures::stream;

    use super::*;
    use crate::{
        GatewayError,
        messages::{ChatCompletionChunk, ChunkChoice, ChunkDelta, FinishReason, OBJECT_CHAT_COMPLETION_CHUNK},
        sse::parser::parse_json_record_stream,
    };

    fn chunk(piece: Option<&str>, finish: Option<FinishReason>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: "chatcmpl-test".into(),
            object: OBJECT_CHAT_COMPLETION_CHUNK.into(),
            created: 1,
            model: "m".into(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    content: piece.map(str::to_string),
                },
                finish_reason: finish,
            }],
        }
    }

    #[tokio::test]
    async fn frames_end_with_done_sentinel() {
        let chunks: ChatCompletionStream = Box::pin(stream::iter(vec![
            Ok(chunk(Some("a"), None)),
            Ok(chunk(None, Some(FinishReason::Stop))),
        ]));

        let frames: Vec<String> = frame_data(chunks).collect().await;

        assert_eq!(frames.len(), 3);
        assert_eq!(frames.last().unwrap(), DONE_SENTINEL);
        assert!(frames[0].contains(r#""content":"a""#));
        assert!(frames[1].contains(r#""finish_reason":"stop""#));
    }

    #[tokio::test]
    async fn mid_stream_error_becomes_error_event_then_done() {
        let chunks: ChatCompletionStream = Box::pin(stream::iter(vec![
            Ok(chunk(Some("a"), None)),
            Err(GatewayError::upstream()),
            Ok(chunk(Some("never sent"), None)),
        ]));

        let frames: Vec<String> = frame_data(chunks).collect().await;

        assert_eq!(frames.len(), 3);
        assert!(frames[1].contains(r#""type":"provider_error""#));
        assert_eq!(frames[2], DONE_SENTINEL);
    }

    #[tokio::test]
    async fn framed_stream_round_trips_through_the_line_parser() {
        let chunks: ChatCompletionStream = Box::pin(stream::iter(vec![
            Ok(chunk(Some("x"), None)),
            Ok(chunk(Some("y"), None)),
            Ok(chunk(None, Some(FinishReason::Stop))),
        ]));

        let wire: String = frame_data(chunks).map(|data| format!("data: {data}\n\n")).collect().await;
        assert!(wire.ends_with("data: [DONE]\n\n"));

        let bytes = stream::once(async move { Ok(Bytes::from(wire)) });
        let records: Vec<_> = parse_json_record_stream(Box::pin(bytes)).collect().await;

        // The sentinel is swallowed by the parser; the chunks survive intact.
        assert_eq!(records.len(), 3);
        let first = records[0].as_ref().unwrap();
        assert_eq!(first["choices"][0]["delta"]["content"], "x");
        let last = records[2].as_ref().unwrap();
        assert_eq!(last["choices"][0]["finish_reason"], "stop");
    }
}
