use crate::ai::{ChatModel, Message};
use crate::config::LlmSettings;
use crate::error::RouterError;
use crate::retry;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAICompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAiChatClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, RouterError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        // Only add auth header if API key is provided
        if let Some(api_key) = settings.api_key.as_deref() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| RouterError::Config(format!("Invalid API key format: {}", e)))?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RouterError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, messages: Vec<Message>, json_mode: bool) -> Result<String, RouterError> {
        let request = OpenAICompletionRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: 0.3,
            response_format: json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        log::info!(
            "[LLM] Sending request to {} with model {} ({} messages, json: {})",
            self.endpoint,
            self.model,
            request.messages.len(),
            json_mode
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| retry::from_reqwest_error("LLM request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<OpenAIErrorResponse>(&error_text)
                .map(|r| r.error.message)
                .unwrap_or(error_text);
            return Err(retry::from_status("LLM API", status.as_u16(), &detail));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| retry::from_reqwest_error("Failed to read LLM response", e))?;

        log::debug!("[LLM] Raw response:\n{}", response_text);

        let response_data: OpenAICompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| RouterError::upstream(format!("Failed to parse LLM response: {}", e)))?;

        let choice = response_data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RouterError::upstream("LLM API returned no choices"))?;

        log::debug!("[LLM] finish_reason: {:?}", choice.finish_reason);

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_sets_response_format() {
        let request = OpenAICompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![],
            max_tokens: 16,
            temperature: 0.3,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");

        let plain = OpenAICompletionRequest {
            response_format: None,
            ..request
        };
        assert!(serde_json::to_value(&plain).unwrap().get("response_format").is_none());
    }

    #[test]
    fn test_error_body_message() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
        let parsed: OpenAIErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Rate limit reached");
    }
}
