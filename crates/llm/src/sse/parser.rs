use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use serde_json::Value;

use crate::error::GatewayError;

/// A lazy, single-pass sequence of parsed upstream JSON records.
pub(crate) type JsonRecordStream = Pin<Box<dyn Stream<Item = crate::Result<Value>> + Send>>;

/// Parse an upstream byte stream into JSON records.
///
/// Upstreams emit either one JSON object per line (JSON-lines) or SSE-style
/// `data: <json>` lines; some terminate with a `data: [DONE]` sentinel. This
/// parser accepts both framings from the same stream: it buffers partial
/// chunks, skips blank lines and `:` comments, swallows the sentinel (ending
/// the stream), and tolerates the odd unparseable line. Transport failures
/// and invalid UTF-8 surface as a single provider error item.
pub(crate) fn parse_json_record_stream<S>(byte_stream: S) -> JsonRecordStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    enum State<S> {
        Reading(S, String),
        Finished,
    }

    let records = stream::unfold(State::Reading(byte_stream, String::new()), |state| async move {
        let State::Reading(mut byte_stream, mut buffer) = state else {
            return None;
        };

        match byte_stream.next().await {
            Some(Ok(bytes)) => {
                let Ok(text) = std::str::from_utf8(&bytes) else {
                    log::error!("invalid UTF-8 in upstream stream");
                    return Some((
                        vec![Err(GatewayError::Provider("invalid UTF-8 in upstream stream".into()))],
                        State::Finished,
                    ));
                };
                buffer.push_str(text);

                let mut records = Vec::new();
                while let Some(newline) = buffer.find('\n') {
                    let line: String = buffer.drain(..=newline).collect();
                    match parse_stream_line(line.trim_end_matches(['\r', '\n'])) {
                        ParsedLine::Record(value) => records.push(Ok(value)),
                        ParsedLine::Done => return Some((records, State::Finished)),
                        ParsedLine::Skip => {}
                    }
                }

                Some((records, State::Reading(byte_stream, buffer)))
            }
            Some(Err(e)) => {
                log::error!("upstream stream read error: {e}");
                Some((
                    vec![Err(GatewayError::Provider(format!("upstream stream error: {e}")))],
                    State::Finished,
                ))
            }
            None => {
                // End of stream; a final line may lack its trailing newline.
                match parse_stream_line(buffer.trim()) {
                    ParsedLine::Record(value) => Some((vec![Ok(value)], State::Finished)),
                    ParsedLine::Done | ParsedLine::Skip => None,
                }
            }
        }
    });

    Box::pin(records.flat_map(stream::iter))
}

enum ParsedLine {
    Record(Value),
    Done,
    Skip,
}

/// Decode one line, stripping the SSE `data:` prefix when present.
fn parse_stream_line(line: &str) -> ParsedLine {
    let mut text = line.trim();

    if text.is_empty() || text.starts_with(':') {
        return ParsedLine::Skip;
    }

    if let Some(rest) = text.strip_prefix("data:") {
        text = rest.trim();
        if text.is_empty() {
            return ParsedLine::Skip;
        }
    }

    if text == "[DONE]" {
        return ParsedLine::Done;
    }

    match sonic_rs::from_str::<Value>(text) {
        Ok(value) => ParsedLine::Record(value),
        Err(e) => {
            log::debug!("skipping unparseable stream line: {e}");
            ParsedLine::Skip
        }
    }
}
