use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::core::config::{Config, ModelConfig, ProxyConfig};
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::providers::resolve_model;
use crate::models::openai::OpenAiCompatModel;
use crate::models::qwen::QwenModel;
use crate::models::{ChatModel, Reply, ReplyStream};
use crate::utils::test_utils::TestEnvVarGuard;

fn chat_config(server: &MockServer) -> ModelConfig {
    ModelConfig {
        api_key: "sk-test".to_string(),
        model: "gpt-4o-mini".to_string(),
        api_base: format!("{}/v1", server.uri()),
    }
}

fn openai_model(server: &MockServer) -> OpenAiCompatModel {
    OpenAiCompatModel::new(
        "openai",
        &chat_config(server),
        &ProxyConfig::default(),
        None,
    )
    .unwrap()
}

fn qwen_model(server: &MockServer) -> QwenModel {
    let config = ModelConfig {
        api_key: "sk-test".to_string(),
        model: "qwen-max".to_string(),
        api_base: format!("{}/api/v1", server.uri()),
    };
    QwenModel::new(&config, &ProxyConfig::default(), None).unwrap()
}

async fn collect(mut stream: ReplyStream) -> Vec<String> {
    let mut fragments = Vec::new();
    while let Some(fragment) = stream.next().await {
        fragments.push(fragment);
    }
    fragments
}

fn into_stream(reply: Reply) -> ReplyStream {
    match reply {
        Reply::Stream(stream) => stream,
        Reply::Complete(text) => panic!("expected a stream, got complete reply {text:?}"),
    }
}

fn into_complete(reply: Reply) -> String {
    match reply {
        Reply::Complete(text) => text,
        Reply::Stream(_) => panic!("expected a complete reply, got a stream"),
    }
}

#[tokio::test]
async fn streaming_and_non_streaming_record_the_same_reply() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        "\n",
        "data: [DONE]\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("\"stream\":true"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("\"stream\":false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Hello"}}]
        })))
        .mount(&server)
        .await;

    let mut streamed = Conversation::new(Box::new(openai_model(&server)), 10);
    let mut seen = Vec::new();
    let mut sink = |fragment: &str| seen.push(fragment.to_string());
    let returned = streamed.send_message("hi", true, &mut sink).await;
    drop(sink);
    assert_eq!(returned, None);
    assert_eq!(seen, vec!["Hel".to_string(), "lo".to_string()]);

    let mut direct = Conversation::new(Box::new(openai_model(&server)), 10);
    let mut noop = |_fragment: &str| {};
    let reply = direct.send_message("hi", false, &mut noop).await;
    assert_eq!(reply.as_deref(), Some("Hello"));

    assert_eq!(streamed.messages()[1].content, "Hello");
    assert_eq!(direct.messages()[1].content, "Hello");
}

#[tokio::test]
async fn malformed_stream_lines_do_not_abort_the_sequence() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        "data: {this is not json\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        "data: [DONE]\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;

    let model = openai_model(&server);
    let stream = into_stream(model.generate(&[Message::user("hi")], true).await);
    assert_eq!(collect(stream).await, vec!["Hel".to_string(), "lo".to_string()]);
}

#[tokio::test]
async fn done_sentinel_ends_the_stream_ignoring_later_lines() {
    let server = MockServer::start().await;
    let sse_body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body, "text/event-stream"))
        .mount(&server)
        .await;

    let model = openai_model(&server);
    let mut stream = into_stream(model.generate(&[Message::user("hi")], true).await);
    assert_eq!(stream.next().await.as_deref(), Some("Hello"));
    assert_eq!(stream.next().await, None);
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn http_errors_become_reply_content_in_both_modes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "quota exceeded"}})),
        )
        .mount(&server)
        .await;

    let model = openai_model(&server);

    let mut stream = into_stream(model.generate(&[Message::user("hi")], true).await);
    let fragment = stream.next().await.expect("error fragment");
    assert!(fragment.contains("429"));
    assert!(fragment.contains("quota exceeded"));
    assert_eq!(stream.next().await, None);

    let complete = into_complete(model.generate(&[Message::user("hi")], false).await);
    assert_eq!(complete, fragment);
}

#[tokio::test]
async fn error_replies_are_recorded_so_the_session_stays_usable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;

    let mut conversation = Conversation::new(Box::new(openai_model(&server)), 10);
    let mut noop = |_fragment: &str| {};
    let reply = conversation.send_message("hi", false, &mut noop).await;

    assert!(reply.unwrap().contains("upstream broke"));
    assert_eq!(conversation.messages().len(), 2);
    assert!(conversation.messages()[1].content.contains("500"));
}

#[tokio::test]
async fn env_fallback_key_reaches_the_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Hello"}}]
        })))
        .mount(&server)
        .await;

    let mut config = Config::default();
    config.models.get_mut("openai").unwrap().api_base = format!("{}/v1", server.uri());

    // The key is copied out of the environment at resolution time.
    let model = {
        let mut guard = TestEnvVarGuard::new();
        guard.set_var("OPENAI_API_KEY", "sk-env");
        resolve_model("openai", &config).unwrap()
    };

    let reply = model.generate(&[Message::user("hi")], false).await;
    assert_eq!(into_complete(reply), "Hello");
}

#[tokio::test]
async fn qwen_requests_nest_input_and_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/services/aigc/text-generation/generation"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "input": {"messages": [{"role": "user", "content": "hi"}]},
            "parameters": {"stream": true},
        })))
        // Bare JSON lines, no sentinel; the last line has no trailing newline.
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"output\":{\"text\":\"He\"}}\n{\"output\":{\"text\":\"llo\"}}",
            "application/json",
        ))
        .mount(&server)
        .await;

    let model = qwen_model(&server);
    let stream = into_stream(model.generate(&[Message::user("hi")], true).await);
    assert_eq!(collect(stream).await, vec!["He".to_string(), "llo".to_string()]);
}

#[tokio::test]
async fn qwen_non_streaming_reads_output_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/services/aigc/text-generation/generation"))
        .and(body_partial_json(json!({"parameters": {"stream": false}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"output": {"text": "Hello"}})),
        )
        .mount(&server)
        .await;

    let model = qwen_model(&server);
    let reply = model.generate(&[Message::user("hi")], false).await;
    assert_eq!(into_complete(reply), "Hello");
}

#[tokio::test]
async fn non_streaming_missing_fields_yield_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let model = openai_model(&server);
    let reply = model.generate(&[Message::user("hi")], false).await;
    assert_eq!(into_complete(reply), "");
}
