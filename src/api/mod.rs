//! Request and response payloads for the supported provider wire formats.
//!
//! Two families are spoken: the OpenAI-compatible chat-completions API
//! (shared by OpenAI and DeepSeek) and the DashScope text-generation API
//! used by Qwen.

use serde::{Deserialize, Serialize};

/// Chat message as transmitted to either provider family.
#[derive(Serialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// OpenAI-compatible chat-completions family.

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
}

/// One streamed chunk of a chat-completions reply.
#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

#[derive(Deserialize)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
}

/// Non-streamed chat-completions reply.
#[derive(Deserialize)]
pub struct ChatCompletion {
    pub choices: Vec<ChatCompletionChoice>,
}

// DashScope text-generation family. Messages nest under `input` and the
// stream flag under `parameters`.

#[derive(Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub input: GenerationInput,
    pub parameters: GenerationParameters,
}

#[derive(Serialize)]
pub struct GenerationInput {
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct GenerationParameters {
    pub stream: bool,
}

#[derive(Deserialize, Default)]
pub struct GenerationOutput {
    #[serde(default)]
    pub text: String,
}

/// Reply line of the text-generation API, streamed or not.
#[derive(Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub output: GenerationOutput,
}
