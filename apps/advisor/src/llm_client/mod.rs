//! Completion Gateway: the single point of entry for generation calls.
//!
//! ARCHITECTURAL RULE: No other module may call the generation endpoint directly.
//!
//! One call per turn. Nothing in here retries: a failed call is reported with
//! enough raw payload to log, and the caller decides what happens next.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::advice::contract::{decode_advice_response, AdviceResponse};
use crate::config::GenerationSettings;
use crate::models::conversation::ConversationTurn;

pub mod prompts;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure or timeout.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("generation endpoint returned status {status}")]
    Http { status: u16, body: String },

    /// The outer envelope could not be read.
    #[error("malformed response envelope: {reason}")]
    Malformed { reason: String, body: String },

    /// The inner content does not satisfy the response contract.
    #[error("response contract violation: {reason}")]
    SchemaViolation { reason: String, raw_content: String },
}

impl GatewayError {
    /// The raw body or content to log alongside the error.
    pub fn raw_payload(&self) -> &str {
        match self {
            GatewayError::Transport(_) => "",
            GatewayError::Http { body, .. } | GatewayError::Malformed { body, .. } => body,
            GatewayError::SchemaViolation { raw_content, .. } => raw_content,
        }
    }
}

/// A validated completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub response: AdviceResponse,
    /// Inner content as returned by the model, kept for the transcript.
    pub raw_content: String,
    pub tokens_used: u32,
    pub model: String,
}

/// Envelope content before contract validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCompletion {
    pub content: String,
    pub tokens_used: u32,
}

/// The gateway trait. Carried in `AppState` as `Arc<dyn CompletionGateway>`.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Sends `[system, ...history]` and returns the validated reply.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
    ) -> Result<Completion, GatewayError>;

    /// Sends a minimal request to check credentials and reachability.
    async fn probe(&self) -> Result<(), GatewayError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (OpenAI-compatible chat completions)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI gateway
// ────────────────────────────────────────────────────────────────────────────

/// Production gateway over an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: Client,
    settings: GenerationSettings,
}

impl OpenAiGateway {
    pub fn new(settings: GenerationSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Makes one call and returns the inner content. No contract checks.
    async fn send(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
    ) -> Result<RawCompletion, GatewayError> {
        let request_body = build_request(&self.settings, system_prompt, history);

        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        parse_envelope(status, &body)
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
    ) -> Result<Completion, GatewayError> {
        let raw = self.send(system_prompt, history).await?;

        debug!(
            "Generation call succeeded: model={}, total_tokens={}",
            self.settings.model, raw.tokens_used
        );

        let response = decode_content(&raw.content)?;

        Ok(Completion {
            response,
            raw_content: raw.content,
            tokens_used: raw.tokens_used,
            model: self.settings.model.clone(),
        })
    }

    async fn probe(&self) -> Result<(), GatewayError> {
        let history = [ConversationTurn::user(prompts::PROBE_MESSAGE)];
        self.send(prompts::PROBE_SYSTEM, &history).await.map(|_| ())
    }
}

fn build_request<'a>(
    settings: &'a GenerationSettings,
    system_prompt: &'a str,
    history: &'a [ConversationTurn],
) -> ChatCompletionRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage {
        role: "system",
        content: system_prompt,
    });
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: turn.role.as_str(),
        content: &turn.content,
    }));

    ChatCompletionRequest {
        model: &settings.model,
        messages,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
        response_format: ResponseFormat {
            format_type: "json_object",
        },
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Transport(format!("request timed out: {e}"))
    } else {
        GatewayError::Transport(e.to_string())
    }
}

/// Reads status and outer envelope into the model's inner content.
fn parse_envelope(status: u16, body: &str) -> Result<RawCompletion, GatewayError> {
    if !(200..300).contains(&status) {
        return Err(GatewayError::Http {
            status,
            body: body.to_string(),
        });
    }

    let envelope: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| GatewayError::Malformed {
            reason: e.to_string(),
            body: body.to_string(),
        })?;

    let content = envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| GatewayError::Malformed {
            reason: "no choices[0].message.content".to_string(),
            body: body.to_string(),
        })?;

    Ok(RawCompletion {
        content,
        tokens_used: envelope.usage.map(|u| u.total_tokens).unwrap_or(0),
    })
}

/// Decodes the inner content into the response contract.
fn decode_content(content: &str) -> Result<AdviceResponse, GatewayError> {
    decode_advice_response(strip_json_fences(content)).map_err(|violation| {
        GatewayError::SchemaViolation {
            reason: violation.to_string(),
            raw_content: content.to_string(),
        }
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_URL;
    use serde_json::json;
    use std::time::Duration;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 1500,
            timeout: Duration::from_secs(30),
        }
    }

    fn envelope_with(content: &str) -> String {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 900, "completion_tokens": 334, "total_tokens": 1234}
        })
        .to_string()
    }

    #[test]
    fn test_request_body_shape() {
        let settings = settings();
        let history = vec![
            ConversationTurn::user("Mijn knie doet pijn"),
            ConversationTurn::assistant("{\"message_type\":\"question\"}"),
            ConversationTurn::user("Sinds een week"),
        ];
        let body = serde_json::to_value(build_request(&settings, "SYSTEM", &history)).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["response_format"]["type"], "json_object");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], json!({"role": "system", "content": "SYSTEM"}));
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "Sinds een week");
    }

    #[test]
    fn test_envelope_success() {
        let raw = parse_envelope(200, &envelope_with("{}")).unwrap();
        assert_eq!(raw.content, "{}");
        assert_eq!(raw.tokens_used, 1234);
    }

    #[test]
    fn test_envelope_without_usage_counts_zero() {
        let body = json!({"choices": [{"message": {"content": "{}"}}]}).to_string();
        assert_eq!(parse_envelope(200, &body).unwrap().tokens_used, 0);
    }

    #[test]
    fn test_non_success_status_is_http_error() {
        let err = parse_envelope(429, "{\"error\":{\"message\":\"slow down\"}}").unwrap_err();
        match err {
            GatewayError::Http { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("slow down"));
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_envelope_is_malformed() {
        let err = parse_envelope(200, "<html>gateway</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Malformed { .. }));
        assert_eq!(err.raw_payload(), "<html>gateway</html>");
    }

    #[test]
    fn test_missing_content_is_malformed() {
        let body = json!({"choices": []}).to_string();
        assert!(matches!(
            parse_envelope(200, &body),
            Err(GatewayError::Malformed { .. })
        ));
    }

    #[test]
    fn test_decode_valid_question() {
        let response =
            decode_content(r#"{"message_type":"question","personal_message":"Hoi","question":"Waar?"}"#)
                .unwrap();
        assert!(matches!(response, AdviceResponse::Question(_)));
    }

    #[test]
    fn test_decode_fenced_content() {
        let fenced = "```json\n{\"message_type\":\"question\",\"personal_message\":\"Hoi\"}\n```";
        assert!(decode_content(fenced).is_ok());
    }

    #[test]
    fn test_schema_violation_keeps_raw_content() {
        let raw = r#"{"message_type":"advice","personal_message":"Hoi"}"#;
        match decode_content(raw).unwrap_err() {
            GatewayError::SchemaViolation {
                reason,
                raw_content,
            } => {
                assert!(reason.contains("product_recommendation"));
                assert_eq!(raw_content, raw);
            }
            other => panic!("expected SchemaViolation, got {other:?}"),
        }
    }

    #[test]
    fn test_non_json_content_is_schema_violation() {
        assert!(matches!(
            decode_content("Ik weet het niet"),
            Err(GatewayError::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let mut settings = settings();
        settings.api_url = "http://127.0.0.1:9/v1/chat/completions".to_string();
        settings.timeout = Duration::from_secs(2);
        let gateway = OpenAiGateway::new(settings).unwrap();
        let err = gateway
            .complete("SYSTEM", &[ConversationTurn::user("knie")])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out_as_transport_error() {
        // accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let mut settings = settings();
        settings.api_url = format!("http://{addr}/v1/chat/completions");
        settings.timeout = Duration::from_secs(1);
        let gateway = OpenAiGateway::new(settings).unwrap();

        match gateway
            .complete("SYSTEM", &[ConversationTurn::user("knie")])
            .await
            .unwrap_err()
        {
            GatewayError::Transport(message) => assert!(message.contains("timed out")),
            other => panic!("expected Transport, got {other:?}"),
        }
    }
}
