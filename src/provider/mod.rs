// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Multimodal answer providers
//!
//! Each provider turns a prompt plus raw image bytes into answer text. They
//! differ only in request shape; all of them send the prompt unmodified and
//! the image bytes without recompression, and return the trimmed primary
//! text of the response. Exactly one provider is built at startup.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::{AppConfig, ProviderKind};
use crate::error::ProviderError;
use crate::{Result, SnapsolveError};

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Something that can answer the questions in a screenshot
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Model the requests are sent to
    fn model(&self) -> &str;

    /// Answer `prompt` about the image. Never returns an empty answer.
    async fn answer(&self, prompt: &str, image: &[u8], mime_type: &str) -> ProviderResult<String>;
}

/// Build the provider selected in the configuration
pub fn build_provider(config: &AppConfig) -> Result<Box<dyn AnswerProvider>> {
    let client = http_client()?;
    let api_key = config.api_key.trim().to_string();
    let model = config.model.trim().to_string();
    let base_url = config.api_base.as_deref();

    let provider: Box<dyn AnswerProvider> = match config.provider {
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(client, api_key, model, base_url)),
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(client, api_key, model, base_url)),
        ProviderKind::Gemini => Box::new(GeminiProvider::new(client, api_key, model, base_url)),
    };

    Ok(match config.request_timeout() {
        Some(limit) => Box::new(TimeLimited::new(provider, limit)),
        None => provider,
    })
}

/// Bounds every call of the wrapped provider
pub struct TimeLimited {
    inner: Box<dyn AnswerProvider>,
    limit: Duration,
}

impl TimeLimited {
    pub fn new(inner: Box<dyn AnswerProvider>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl AnswerProvider for TimeLimited {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn answer(&self, prompt: &str, image: &[u8], mime_type: &str) -> ProviderResult<String> {
        match tokio::time::timeout(self.limit, self.inner.answer(prompt, image, mime_type)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.limit)),
        }
    }
}

fn http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| SnapsolveError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Strip a trailing slash so paths can be appended with `format!`
pub(crate) fn normalize_base(base_url: Option<&str>, default: &str) -> String {
    base_url.unwrap_or(default).trim_end_matches('/').to_string()
}

pub(crate) fn encode_image(image: &[u8]) -> String {
    general_purpose::STANDARD.encode(image)
}

/// Send a JSON request and decode the JSON reply, mapping failures onto [`ProviderError`]
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> ProviderResult<T> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth {
                status: status.as_u16(),
                body,
            },
            _ => ProviderError::Status {
                status: status.as_u16(),
                body,
            },
        });
    }

    let bytes = response.bytes().await?;
    debug!("Provider replied with {} bytes", bytes.len());
    serde_json::from_slice(&bytes).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Trimmed answer, or a malformed-response error when there is no text
pub(crate) fn primary_text(text: Option<String>, what: &str) -> ProviderResult<String> {
    let text = text.map(|t| t.trim().to_string()).unwrap_or_default();
    if text.is_empty() {
        return Err(ProviderError::Malformed(format!("no text in {}", what)));
    }
    Ok(text)
}
