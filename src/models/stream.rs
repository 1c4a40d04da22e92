//! Pull-based fragment stream over a streamed HTTP reply body.
//!
//! The consumer drives progress one fragment at a time; the HTTP body is
//! read only as fast as fragments are pulled, so backpressure is inherent
//! and nothing is buffered beyond the current partial line.

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use memchr::memchr;

use crate::api::{ChatResponse, GenerationResponse};

/// Per-line decoding applied to a streamed response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// Server-sent-event records: `data: <json>` terminated by `data: [DONE]`.
    Sse,
    /// One bare JSON object per line; the stream ends with the body.
    JsonLines,
}

enum LineOutcome {
    Fragment(String),
    Skip,
    End,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn decode_line(format: LineFormat, line: &str) -> LineOutcome {
    match format {
        LineFormat::Sse => {
            let Some(payload) = extract_data_payload(line) else {
                // Blank keep-alives and non-data SSE fields carry no content.
                return LineOutcome::Skip;
            };
            if payload == "[DONE]" {
                return LineOutcome::End;
            }
            match serde_json::from_str::<ChatResponse>(payload) {
                Ok(response) => {
                    let content = response
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.delta.content);
                    match content {
                        Some(content) if !content.is_empty() => LineOutcome::Fragment(content),
                        _ => LineOutcome::Skip,
                    }
                }
                Err(err) => {
                    if !payload.trim().is_empty() {
                        tracing::debug!("skipping unparsable stream line: {err}");
                    }
                    LineOutcome::Skip
                }
            }
        }
        LineFormat::JsonLines => {
            if line.is_empty() {
                return LineOutcome::Skip;
            }
            match serde_json::from_str::<GenerationResponse>(line) {
                Ok(response) if !response.output.text.is_empty() => {
                    LineOutcome::Fragment(response.output.text)
                }
                Ok(_) => LineOutcome::Skip,
                Err(err) => {
                    tracing::debug!("skipping unparsable stream line: {err}");
                    LineOutcome::Skip
                }
            }
        }
    }
}

type BodyStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

/// A finite, single-pass sequence of assistant reply fragments.
///
/// Pulling with [`ReplyStream::next`] is the only way to observe a streamed
/// reply; `None` signals exhaustion and the stream cannot be restarted.
pub struct ReplyStream {
    source: Source,
}

enum Source {
    Fragments(std::vec::IntoIter<String>),
    Http(HttpSource),
}

struct HttpSource {
    body: BodyStream,
    format: LineFormat,
    buffer: Vec<u8>,
    done: bool,
}

impl ReplyStream {
    /// Stream that yields the given fragments in order, then ends.
    pub fn from_fragments(fragments: Vec<String>) -> Self {
        Self {
            source: Source::Fragments(fragments.into_iter()),
        }
    }

    /// Stream carrying a single fragment, used to report request failures
    /// as reply content.
    pub fn once(text: impl Into<String>) -> Self {
        Self::from_fragments(vec![text.into()])
    }

    pub(crate) fn from_response(response: reqwest::Response, format: LineFormat) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Self {
            source: Source::Http(HttpSource {
                body,
                format,
                buffer: Vec::new(),
                done: false,
            }),
        }
    }

    /// Pull the next fragment; `None` signals exhaustion.
    pub async fn next(&mut self) -> Option<String> {
        match &mut self.source {
            Source::Fragments(fragments) => fragments.next(),
            Source::Http(http) => http.next_fragment().await,
        }
    }
}

impl HttpSource {
    async fn next_fragment(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        loop {
            while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
                let outcome = match std::str::from_utf8(&self.buffer[..newline_pos]) {
                    Ok(line) => decode_line(self.format, line.trim()),
                    Err(err) => {
                        tracing::debug!("invalid UTF-8 in stream: {err}");
                        LineOutcome::Skip
                    }
                };
                self.buffer.drain(..=newline_pos);
                match outcome {
                    LineOutcome::Fragment(fragment) => return Some(fragment),
                    LineOutcome::End => {
                        self.done = true;
                        return None;
                    }
                    LineOutcome::Skip => {}
                }
            }

            match self.body.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    self.done = true;
                    return Some(super::format_transport_error(&err));
                }
                None => {
                    self.done = true;
                    if self.buffer.is_empty() {
                        return None;
                    }
                    // A final line without a trailing newline still counts.
                    let outcome = match std::str::from_utf8(&self.buffer) {
                        Ok(line) => decode_line(self.format, line.trim()),
                        Err(err) => {
                            tracing::debug!("invalid UTF-8 in stream: {err}");
                            LineOutcome::Skip
                        }
                    };
                    self.buffer.clear();
                    return match outcome {
                        LineOutcome::Fragment(fragment) => Some(fragment),
                        _ => None,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(outcome: LineOutcome) -> Option<String> {
        match outcome {
            LineOutcome::Fragment(text) => Some(text),
            _ => None,
        }
    }

    #[test]
    fn sse_payload_extraction_handles_spacing_variants() {
        let variants = [
            (r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#, "Hello"),
            (r#"data:{"choices":[{"delta":{"content":"World"}}]}"#, "World"),
        ];
        for (line, expected) in variants {
            assert_eq!(
                fragment(decode_line(LineFormat::Sse, line)).as_deref(),
                Some(expected)
            );
        }
    }

    #[test]
    fn sse_done_sentinel_ends_the_stream() {
        assert!(matches!(
            decode_line(LineFormat::Sse, "data: [DONE]"),
            LineOutcome::End
        ));
        assert!(matches!(
            decode_line(LineFormat::Sse, "data:[DONE]"),
            LineOutcome::End
        ));
    }

    #[test]
    fn sse_empty_or_absent_delta_yields_no_fragment() {
        for line in [
            r#"data: {"choices":[{"delta":{}}]}"#,
            r#"data: {"choices":[{"delta":{"content":""}}]}"#,
            r#"data: {"choices":[]}"#,
        ] {
            assert!(matches!(decode_line(LineFormat::Sse, line), LineOutcome::Skip));
        }
    }

    #[test]
    fn sse_unparsable_payload_is_skipped_not_fatal() {
        assert!(matches!(
            decode_line(LineFormat::Sse, "data: {not json"),
            LineOutcome::Skip
        ));
        // Lines without the data prefix are ignored entirely.
        assert!(matches!(decode_line(LineFormat::Sse, ": ping"), LineOutcome::Skip));
    }

    #[test]
    fn json_lines_extract_output_text() {
        assert_eq!(
            fragment(decode_line(
                LineFormat::JsonLines,
                r#"{"output":{"text":"你好"}}"#
            ))
            .as_deref(),
            Some("你好")
        );
        assert!(matches!(
            decode_line(LineFormat::JsonLines, r#"{"output":{"text":""}}"#),
            LineOutcome::Skip
        ));
        assert!(matches!(
            decode_line(LineFormat::JsonLines, "not json"),
            LineOutcome::Skip
        ));
    }

    #[tokio::test]
    async fn fragment_streams_yield_in_order_and_exhaust() {
        let mut stream =
            ReplyStream::from_fragments(vec!["Hel".to_string(), "lo".to_string()]);
        assert_eq!(stream.next().await.as_deref(), Some("Hel"));
        assert_eq!(stream.next().await.as_deref(), Some("lo"));
        assert_eq!(stream.next().await, None);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn once_yields_a_single_fragment() {
        let mut stream = ReplyStream::once("boom");
        assert_eq!(stream.next().await.as_deref(), Some("boom"));
        assert_eq!(stream.next().await, None);
    }
}
