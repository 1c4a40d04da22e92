//! DashScope text-generation adapter for Qwen.
//!
//! The wire format differs from chat-completions on both sides: requests
//! nest messages under `input` and the stream flag under `parameters`, and
//! streamed replies are bare JSON lines with no sentinel — the stream ends
//! with the response body.

use std::time::Duration;

use async_trait::async_trait;

use crate::api::{GenerationInput, GenerationParameters, GenerationRequest, GenerationResponse};
use crate::core::config::{ModelConfig, ProxyConfig};
use crate::core::message::Message;
use crate::models::stream::{LineFormat, ReplyStream};
use crate::models::{
    build_client, error_reply, format_http_error, format_transport_error, to_wire, ChatModel,
    Reply,
};
use crate::utils::url::construct_api_url;

const GENERATION_ENDPOINT: &str = "services/aigc/text-generation/generation";

pub struct QwenModel {
    model: String,
    api_base: String,
    api_key: String,
    timeout: Option<Duration>,
    client: reqwest::Client,
}

impl QwenModel {
    pub fn new(
        config: &ModelConfig,
        proxy: &ProxyConfig,
        timeout: Option<Duration>,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            timeout,
            client: build_client(proxy, timeout)?,
        })
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> reqwest::Result<reqwest::Response> {
        let url = construct_api_url(&self.api_base, GENERATION_ENDPOINT);
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
impl ChatModel for QwenModel {
    async fn generate(&self, messages: &[Message], stream: bool) -> Reply {
        let request = GenerationRequest {
            model: self.model.clone(),
            input: GenerationInput {
                messages: to_wire(messages),
            },
            parameters: GenerationParameters { stream },
        };

        let response = match self.send(&request, stream).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("generation request failed: {err}");
                return error_reply(stream, format_transport_error(&err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return error_reply(stream, format_http_error(status, &body));
        }

        if stream {
            return Reply::Stream(ReplyStream::from_response(response, LineFormat::JsonLines));
        }

        match response.json::<GenerationResponse>().await {
            Ok(generation) => Reply::Complete(generation.output.text),
            Err(err) => Reply::Complete(format_transport_error(&err)),
        }
    }
}
