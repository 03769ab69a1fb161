//! Gemini-compatible `generateContent` client
//!
//! Serves both localization (prompt + inline image) and narrative generation
//! (text-only prompt). Separate instances carry separate generation settings.

use crate::error::ServiceError;
use crate::models::{NarrativeKind, ScreenImage};
use crate::services::ClientSettings;
use crate::types::{LocalizationService, NarrativeService};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    settings: ClientSettings,
}

impl GeminiClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ServiceError> {
        let http_client = settings.http_client()?;
        Ok(Self {
            http_client,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    /// Request body; the image, when given, follows the prompt as inline data
    pub fn request_body(&self, prompt: &str, image: Option<&ScreenImage>) -> Value {
        let mut parts = vec![json!({"text": prompt})];
        if let Some(image) = image {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type(),
                    "data": STANDARD.encode(&image.bytes)
                }
            }));
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = self.settings.temperature {
            generation_config.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = self.settings.max_output_tokens {
            generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
        }

        json!({
            "contents": [{"role": "user", "parts": parts}],
            "generationConfig": generation_config
        })
    }

    async fn generate_content(&self, prompt: &str, image: Option<&ScreenImage>) -> Result<String, ServiceError> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&self.request_body(prompt, image))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ServiceError::from_status(status.as_u16(), &body));
        }

        response_text(&body)
    }
}

/// Concatenated text parts of the first candidate
pub fn response_text(body: &str) -> Result<String, ServiceError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Parse(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ServiceError::Blocked(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ServiceError::EmptyResponse(format!(
            "no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

#[async_trait::async_trait]
impl LocalizationService for GeminiClient {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn localize(&self, image: &ScreenImage, prompt: &str) -> Result<String, ServiceError> {
        tracing::debug!(model = %self.settings.model, "Requesting localization");
        self.generate_content(prompt, Some(image)).await
    }
}

#[async_trait::async_trait]
impl NarrativeService for GeminiClient {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, kind: NarrativeKind, prompt: &str) -> Result<String, ServiceError> {
        tracing::debug!(model = %self.settings.model, kind = %kind, "Requesting narrative");
        self.generate_content(prompt, None).await
    }
}
