//! Incremental server-sent events decoding.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::domain::DomainError;

/// Splits a byte stream into SSE events and returns each event's `data`.
///
/// Bytes are buffered until a blank line closes the event, so events and
/// multi-byte characters may span network chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(data) = event_data(&raw[..pos]) {
                events.push(data);
            }
        }
        events
    }

    /// Returns the final event when the stream ends without a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        event_data(&raw)
    }
}

fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if data.is_empty() {
        None
    } else {
        Some(data.join("\n"))
    }
}

struct EventState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turns an HTTP body into a stream of event payloads. A transport error
/// ends the stream after being yielded.
pub fn events<S, B, E>(bytes: S) -> BoxStream<'static, Result<String, DomainError>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = EventState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Ok(Some((event, state)));
            }
            if state.finished {
                return Ok(None);
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let decoded = state.decoder.push(chunk.as_ref());
                    state.pending.extend(decoded);
                }
                Some(Err(e)) => {
                    return Err(DomainError::generation(format!(
                        "response stream failed: {}",
                        e
                    )));
                }
                None => {
                    state.finished = true;
                    let tail = state.decoder.finish();
                    state.pending.extend(tail);
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_decoder_splits_events() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(events, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_buffers_partial_events() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"te").is_empty());
        assert!(decoder.push(b"xt\":\"hi\"}\r\n").is_empty());
        assert_eq!(decoder.push(b"\r\n"), vec!["{\"text\":\"hi\"}"]);
    }

    #[test]
    fn test_decoder_handles_split_utf8() {
        let payload = "data: café\n\n".as_bytes();
        let split = payload.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&payload[..split]).is_empty());
        assert_eq!(decoder.push(&payload[split..]), vec!["café"]);
    }

    #[test]
    fn test_decoder_ignores_comments_and_joins_data_lines() {
        let mut decoder = SseDecoder::default();
        let events = decoder.push(b": keep-alive\n\nevent: message\ndata: one\ndata: two\n\n");
        assert_eq!(events, vec!["one\ntwo"]);
    }

    #[test]
    fn test_decoder_flushes_unterminated_event() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
    }

    #[tokio::test]
    async fn test_events_across_chunks() {
        let chunks: Vec<Result<&'static [u8], String>> = vec![
            Ok(&b"data: first\n"[..]),
            Ok(&b"\ndata: sec"[..]),
            Ok(&b"ond\n\ndata: last"[..]),
        ];

        let out: Vec<_> = events(stream::iter(chunks)).collect().await;
        let out: Vec<String> = out.into_iter().map(Result::unwrap).collect();
        assert_eq!(out, vec!["first", "second", "last"]);
    }

    #[tokio::test]
    async fn test_events_stop_on_transport_error() {
        let chunks: Vec<Result<&'static [u8], String>> = vec![
            Ok(&b"data: one\n\n"[..]),
            Err("connection reset".to_string()),
            Ok(&b"data: two\n\n"[..]),
        ];

        let out: Vec<_> = events(stream::iter(chunks)).collect().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), "one");
        assert!(matches!(out[1], Err(DomainError::Generation(_))));
    }
}
