// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Google Gemini generateContent with the raw image bytes as inline data

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{encode_image, normalize_base, primary_text, send_json, AnswerProvider, ProviderResult};
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: Blob<'a> },
}

#[derive(Serialize)]
struct Blob<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: String, model: String, base_url: Option<&str>) -> Self {
        // Accept both "gemini-2.0-flash" and "models/gemini-2.0-flash"
        let model = model.trim_start_matches("models/").to_string();
        Self {
            client,
            base_url: normalize_base(base_url, DEFAULT_BASE_URL),
            api_key,
            model,
        }
    }

    fn request<'a>(&self, prompt: &'a str, image: &[u8], mime_type: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type,
                            data: encode_image(image),
                        },
                    },
                ],
            }],
        }
    }
}

/// Text of the first candidate, parts concatenated
fn answer_text(response: GenerateResponse) -> ProviderResult<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no candidates in response".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    primary_text(Some(text), "first candidate")
}

#[async_trait]
impl AnswerProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn answer(&self, prompt: &str, image: &[u8], mime_type: &str) -> ProviderResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("Sending vision request to Gemini: model={}", self.model);

        let response: GenerateResponse = send_json(
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&self.request(prompt, image, mime_type)),
        )
        .await?;

        answer_text(response)
    }
}
