// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Anthropic messages API with an inline base64 image block

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{encode_image, normalize_base, primary_text, send_json, AnswerProvider, ProviderResult};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<Block<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(client: Client, api_key: String, model: String, base_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: normalize_base(base_url, DEFAULT_BASE_URL),
            api_key,
            model,
        }
    }

    fn request<'a>(&'a self, prompt: &'a str, image: &[u8], mime_type: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: vec![
                    Block::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: mime_type,
                            data: encode_image(image),
                        },
                    },
                    Block::Text { text: prompt },
                ],
            }],
        }
    }
}

fn answer_text(response: MessagesResponse) -> ProviderResult<String> {
    let text = response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text);
    primary_text(text, "message content")
}

#[async_trait]
impl AnswerProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn answer(&self, prompt: &str, image: &[u8], mime_type: &str) -> ProviderResult<String> {
        let url = format!("{}/messages", self.base_url);
        debug!("Sending vision request to Anthropic: model={}", self.model);

        let response: MessagesResponse = send_json(
            self.client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&self.request(prompt, image, mime_type)),
        )
        .await?;

        answer_text(response)
    }
}
