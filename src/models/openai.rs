//! OpenAI-compatible chat-completions adapter.
//!
//! Several hosted backends speak this wire format unchanged (OpenAI itself,
//! DeepSeek); they all share this one adapter, parameterized by provider
//! name and base URL.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ChatCompletion, ChatRequest};
use crate::core::config::{ModelConfig, ProxyConfig};
use crate::core::message::Message;
use crate::models::stream::{LineFormat, ReplyStream};
use crate::models::{
    build_client, error_reply, format_http_error, format_transport_error, to_wire, ChatModel,
    Reply,
};
use crate::utils::url::construct_api_url;

pub struct OpenAiCompatModel {
    provider: String,
    model: String,
    api_base: String,
    api_key: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    pub fn new(
        provider: &str,
        config: &ModelConfig,
        proxy: &ProxyConfig,
        timeout: Option<Duration>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            provider: provider.to_string(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            timeout,
            client: build_client(proxy, timeout)?,
        })
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> reqwest::Result<reqwest::Response> {
        let url = construct_api_url(&self.api_base, "chat/completions");
        let mut http_request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request);
        if !stream {
            if let Some(timeout) = self.timeout {
                http_request = http_request.timeout(timeout);
            }
        }
        http_request.send().await
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    async fn generate(&self, messages: &[Message], stream: bool) -> Reply {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: to_wire(messages),
            stream,
        };

        let response = match self.send(&request, stream).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("chat request to {} failed: {err}", self.provider);
                return error_reply(stream, format_transport_error(&err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return error_reply(stream, format_http_error(status, &body));
        }

        if stream {
            return Reply::Stream(ReplyStream::from_response(response, LineFormat::Sse));
        }

        match response.json::<ChatCompletion>().await {
            Ok(completion) => Reply::Complete(
                completion
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .unwrap_or_default(),
            ),
            Err(err) => Reply::Complete(format_transport_error(&err)),
        }
    }
}
