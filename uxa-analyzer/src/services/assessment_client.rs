//! Assessment client (OpenAI-compatible chat completions)
//!
//! Sends the screenshot as a base64 data URL together with the hints and
//! forces the `record_ui_analysis` function tool, whose arguments carry the
//! assessment JSON.

use crate::error::ServiceError;
use crate::models::{ContextHints, ScreenImage};
use crate::services::prompts::{assessment_tool_definition, assessment_user_message, ASSESSMENT_TOOL_NAME};
use crate::services::ClientSettings;
use crate::types::AssessmentService;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// Chat-completions assessment client
pub struct AssessmentClient {
    http_client: reqwest::Client,
    settings: ClientSettings,
    system_prompt: String,
}

impl AssessmentClient {
    pub fn new(settings: ClientSettings, system_prompt: String) -> Result<Self, ServiceError> {
        let http_client = settings.http_client()?;
        Ok(Self {
            http_client,
            settings,
            system_prompt,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Request body for one assessment
    pub fn request_body(&self, image: &ScreenImage, hints: &ContextHints) -> Value {
        let data_url = format!("data:{};base64,{}", image.mime_type(), STANDARD.encode(&image.bytes));

        let mut body = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": self.system_prompt},
                {"role": "user", "content": [
                    {"type": "text", "text": assessment_user_message(hints)},
                    {"type": "image_url", "image_url": {"url": data_url}}
                ]}
            ],
            "tools": [assessment_tool_definition()],
            "tool_choice": {"type": "function", "function": {"name": ASSESSMENT_TOOL_NAME}}
        });

        if let Some(temperature) = self.settings.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.settings.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

/// Extract the forced tool call's arguments from a chat-completions body
pub fn tool_arguments(body: &str) -> Result<String, ServiceError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Parse(e.to_string()))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ServiceError::EmptyResponse("no choices".to_string()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
        return Err(ServiceError::Blocked(refusal));
    }

    let call = message
        .tool_calls
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::EmptyResponse(format!("no '{}' tool call", ASSESSMENT_TOOL_NAME)))?;

    if call.function.name != ASSESSMENT_TOOL_NAME {
        return Err(ServiceError::Parse(format!(
            "unexpected tool call '{}'",
            call.function.name
        )));
    }

    Ok(call.function.arguments)
}

#[async_trait::async_trait]
impl AssessmentService for AssessmentClient {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn assess(&self, image: &ScreenImage, hints: &ContextHints) -> Result<String, ServiceError> {
        tracing::debug!(
            model = %self.settings.model,
            image_bytes = image.bytes.len(),
            "Requesting assessment"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(image, hints))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ServiceError::from_status(status.as_u16(), &body));
        }

        tool_arguments(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> ClientSettings {
        ClientSettings {
            base_url: "https://api.example.test/v1/".into(),
            model: "test-model".into(),
            api_key: "k".into(),
            timeout_secs: 5,
            temperature: None,
            max_output_tokens: Some(1000),
        }
    }

    fn tiny_png() -> ScreenImage {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        ScreenImage::from_bytes(PathBuf::from("t.png"), out.into_inner()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let client = AssessmentClient::new(settings(), "system".into()).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.test/v1/chat/completions");

        let body = client.request_body(&tiny_png(), &ContextHints::default());
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["tool_choice"]["function"]["name"], ASSESSMENT_TOOL_NAME);
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("temperature").is_none());
        let url = body["messages"][1]["content"][1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_tool_arguments_extracted() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null,
            "tool_calls": [{"id": "c1", "type": "function",
            "function": {"name": "record_ui_analysis", "arguments": "{\"a\":1}"}}]}}]}"#;
        assert_eq!(tool_arguments(body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_missing_tool_call_is_empty_response() {
        let body = r#"{"choices": [{"message": {"content": "I can't do that"}}]}"#;
        assert!(matches!(tool_arguments(body), Err(ServiceError::EmptyResponse(_))));
    }

    #[test]
    fn test_refusal_is_blocked() {
        let body = r#"{"choices": [{"message": {"refusal": "policy"}}]}"#;
        assert!(matches!(tool_arguments(body), Err(ServiceError::Blocked(_))));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(tool_arguments("<html>"), Err(ServiceError::Parse(_))));
    }
}
