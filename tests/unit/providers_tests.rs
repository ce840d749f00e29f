/*!
 * Tests for backend clients: wire formats and error mapping
 */

use doctrans::app_config::{BackendKind, TranslationConfig};
use doctrans::errors::ProviderError;
use doctrans::providers::ollama::{parse_chat_response, ChatRequest, Ollama};
use doctrans::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};
use doctrans::providers::{self, ChatMessage, CompletionRequest, Provider};

fn messages() -> Vec<ChatMessage> {
    vec![ChatMessage::system("You translate."), ChatMessage::user("Hello")]
}

#[test]
fn test_openAIRequest_serialize_shouldMatchChatCompletionsShape() {
    let request = OpenAIRequest::new("gemma3", messages()).temperature(0.2);

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["model"], "gemma3");
    assert_eq!(value["stream"], false);
    assert_eq!(value["messages"][0]["role"], "system");
    assert_eq!(value["messages"][1]["content"], "Hello");
    assert!((value["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert!(value.get("max_tokens").is_none());
}

#[test]
fn test_openAIResponse_parse_shouldExposeFirstChoiceAndUsage() {
    let body = r#"{
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": "こんにちは" }, "finish_reason": "stop" }
        ],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    }"#;

    let response: OpenAIResponse = serde_json::from_str(body).unwrap();

    assert_eq!(response.text(), "こんにちは");
    let usage = response.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 12);
    assert_eq!(usage.completion_tokens, 3);
}

#[test]
fn test_openAIResponse_withNullContentOrNoChoices_shouldYieldEmptyText() {
    let null_content: OpenAIResponse =
        serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#).unwrap();
    let no_choices: OpenAIResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();

    assert_eq!(null_content.text(), "");
    assert_eq!(no_choices.text(), "");
}

#[test]
fn test_ollamaChatRequest_serialize_shouldNestTemperatureInOptions() {
    let request = ChatRequest::new("gemma3", messages()).temperature(0.2);

    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["model"], "gemma3");
    assert_eq!(value["stream"], false);
    assert_eq!(value["messages"][1]["content"], "Hello");
    assert!(value["options"]["temperature"].is_number());
    assert!(value.get("keep_alive").is_none());
}

#[test]
fn test_parseChatResponse_withSingleObject_shouldParse() {
    let body = r#"{"model":"gemma3","message":{"role":"assistant","content":"Bonjour"},"done":true,"prompt_eval_count":20,"eval_count":4}"#;

    let response = parse_chat_response(body).unwrap();

    assert_eq!(response.message.content, "Bonjour");
    assert_eq!(response.prompt_eval_count, Some(20));
    assert_eq!(response.eval_count, Some(4));
}

#[test]
fn test_parseChatResponse_withJsonLines_shouldJoinFragments() {
    let body = concat!(
        r#"{"model":"gemma3","message":{"role":"assistant","content":"Bon"},"done":false}"#,
        "\n",
        r#"{"model":"gemma3","message":{"role":"assistant","content":"jour"},"done":false}"#,
        "\n",
        r#"{"model":"gemma3","message":{"role":"assistant","content":""},"done":true,"eval_count":2}"#,
        "\n"
    );

    let response = parse_chat_response(body).unwrap();

    assert_eq!(response.message.content, "Bonjour");
    assert_eq!(response.model, "gemma3");
    assert_eq!(response.eval_count, Some(2));
    assert!(response.done);
}

#[test]
fn test_parseChatResponse_withGarbage_shouldFailWithParseError() {
    assert!(matches!(
        parse_chat_response("<html>Bad Gateway</html>"),
        Err(ProviderError::ParseError(_))
    ));
}

#[test]
fn test_fromStatus_shouldMapAuthAndRateLimits() {
    assert!(matches!(
        ProviderError::from_status(401, "no".into()),
        ProviderError::AuthenticationError(_)
    ));
    assert!(matches!(
        ProviderError::from_status(429, "slow down".into()),
        ProviderError::RateLimitExceeded(_)
    ));
    assert!(matches!(
        ProviderError::from_status(500, "boom".into()),
        ProviderError::ApiError { status_code: 500, .. }
    ));
}

#[test]
fn test_fromConfig_shouldBuildSelectedBackend() {
    let mut config = TranslationConfig::default();
    assert_eq!(providers::from_config(&config).unwrap().name(), "openai");

    config.backend = BackendKind::Ollama;
    assert_eq!(providers::from_config(&config).unwrap().name(), "ollama");
}

#[test]
fn test_openAINew_shouldTrimTrailingSlash() {
    let client = OpenAI::new("http://localhost:11434/v1/", "", 600).unwrap();

    assert_eq!(client.endpoint(), "http://localhost:11434/v1");
}

#[tokio::test]
async fn test_complete_withUnreachableServer_shouldFailWithConnectionError() {
    let openai = OpenAI::new("http://127.0.0.1:1/v1", "", 5).unwrap();
    let ollama = Ollama::new("http://127.0.0.1:1", 5).unwrap();
    let request = CompletionRequest {
        model: "gemma3".to_string(),
        messages: messages(),
        temperature: 0.2,
    };

    assert!(matches!(
        openai.complete(request.clone()).await,
        Err(ProviderError::ConnectionError(_))
    ));
    assert!(matches!(
        ollama.complete(request).await,
        Err(ProviderError::ConnectionError(_))
    ));
    assert!(openai.test_connection().await.is_err());
}
