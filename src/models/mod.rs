//! Provider adapters and the capability contract they implement.
//!
//! Every hosted backend is reached through the single [`ChatModel`]
//! operation; callers never depend on a concrete adapter type.

pub mod openai;
pub mod qwen;
pub mod stream;

#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;

use crate::api::ChatMessage;
use crate::core::config::ProxyConfig;
use crate::core::message::Message;

pub use stream::ReplyStream;

/// One assistant reply, complete or incrementally delivered.
pub enum Reply {
    Complete(String),
    Stream(ReplyStream),
}

/// Capability contract for a hosted chat model.
///
/// Failures never surface as `Err` here: transport and protocol failures
/// are rendered into the reply text, so the conversation that records the
/// reply stays usable.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce a reply to the given history.
    ///
    /// `messages` must be non-empty and end with the user message being
    /// sent. With `stream` set the reply arrives as a [`ReplyStream`];
    /// otherwise as one complete string.
    async fn generate(&self, messages: &[Message], stream: bool) -> Reply;
}

impl std::fmt::Debug for dyn ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChatModel")
    }
}

/// Consumer of streamed reply fragments.
pub trait FragmentSink {
    fn emit(&mut self, fragment: &str);
}

impl<F: FnMut(&str)> FragmentSink for F {
    fn emit(&mut self, fragment: &str) {
        self(fragment)
    }
}

pub(crate) fn to_wire(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|message| ChatMessage {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        })
        .collect()
}

/// Build the HTTP client an adapter uses for every request it issues.
///
/// Proxy settings apply uniformly; the timeout bound is used as the
/// connect bound here and as the total bound on non-streaming requests.
pub(crate) fn build_client(
    proxy: &ProxyConfig,
    timeout: Option<Duration>,
) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if proxy.enabled {
        if let Some(url) = proxy.http.as_deref().filter(|url| !url.is_empty()) {
            builder = builder.proxy(reqwest::Proxy::http(url)?);
        }
        if let Some(url) = proxy.https.as_deref().filter(|url| !url.is_empty()) {
            builder = builder.proxy(reqwest::Proxy::https(url)?);
        }
    }
    if let Some(timeout) = timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder.build()
}

/// Wrap failure text in the reply shape the caller asked for.
pub(crate) fn error_reply(stream: bool, text: String) -> Reply {
    if stream {
        Reply::Stream(ReplyStream::once(text))
    } else {
        Reply::Complete(text)
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value
                .get("error")
                .and_then(|v| v.as_str().map(str::to_owned))
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Render a non-2xx response into conversational error text, status code
/// and body summary included.
pub(crate) fn format_http_error(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    let detail = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .unwrap_or_else(|| {
            if trimmed.is_empty() {
                "<no body>".to_string()
            } else {
                trimmed.to_string()
            }
        });
    format!("API request failed: {status}: {detail}")
}

pub(crate) fn format_transport_error(err: &reqwest::Error) -> String {
    format!("API request failed: {err}")
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn http_error_prefers_the_json_error_summary() {
        let body = r#"{"error":{"message":"model   overloaded","type":"server_error"}}"#;
        let formatted = format_http_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(
            formatted,
            "API request failed: 500 Internal Server Error: model overloaded"
        );
    }

    #[test]
    fn http_error_falls_back_to_the_raw_body() {
        let formatted = format_http_error(reqwest::StatusCode::BAD_GATEWAY, "upstream broke");
        assert_eq!(formatted, "API request failed: 502 Bad Gateway: upstream broke");

        let formatted = format_http_error(reqwest::StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(formatted, "API request failed: 502 Bad Gateway: <no body>");
    }

    #[test]
    fn error_summary_handles_string_and_top_level_shapes() {
        let cases = [
            (r#"{"error":"too many requests"}"#, "too many requests"),
            (r#"{"message":"quota exceeded"}"#, "quota exceeded"),
        ];
        for (body, expected) in cases {
            let value: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(extract_error_summary(&value).as_deref(), Some(expected));
        }
    }
}
