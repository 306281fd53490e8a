// src/services/classifier.rs

//! Text classification over a chat-completions API.
//!
//! Supports the OpenAI API and Azure OpenAI deployments.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::LlmConfig;
use crate::utils::http::snippet;

/// Given a system instruction and a user text, returns the model's free-form reply.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, system: &str, user: &str) -> Result<String>;
}

/// Chat-completions classifier.
pub struct ChatClassifier {
    config: LlmConfig,
    http: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClassifier {
    /// Create a new classifier with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            log::warn!("No LLM API key configured; set OPENAI_API_KEY or llm.api_key");
        }
        if config.is_azure() {
            log::info!("Using Azure OpenAI endpoint {}", config.endpoint);
        } else {
            log::info!("Using OpenAI-compatible endpoint {}", config.endpoint);
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, http })
    }

    /// Chat-completions URL for the configured provider.
    pub fn completions_url(&self) -> Result<Url> {
        let base = self.config.endpoint.trim_end_matches('/');
        let url = if self.config.is_azure() {
            Url::parse_with_params(
                &format!(
                    "{}/openai/deployments/{}/chat/completions",
                    base,
                    self.config.deployment_name()
                ),
                &[("api-version", self.config.api_version.as_str())],
            )?
        } else {
            Url::parse(&format!("{}/chat/completions", base))?
        };
        Ok(url)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::classifier("no API key configured"))?;

        let mut headers = HeaderMap::new();
        if self.config.is_azure() {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key).map_err(AppError::classifier)?,
            );
        } else {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key))
                    .map_err(AppError::classifier)?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn model_name(&self) -> &str {
        if self.config.is_azure() {
            self.config.deployment_name()
        } else {
            &self.config.model
        }
    }
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn classify(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model_name(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        log::debug!("Classifier request to model {}", request.model);

        let response = self
            .http
            .post(self.completions_url()?)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::classifier(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::classifier(format!(
                "HTTP {}: {}",
                status,
                snippet(&body, 300)
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::classifier(format!("unreadable response: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::classifier("empty reply"))
    }
}
