// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! OpenAI chat completions with the image inlined as a data URL

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{encode_image, normalize_base, primary_text, send_json, AnswerProvider, ProviderResult};
use crate::error::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_TOKENS: u32 = 1000;

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(client: Client, api_key: String, model: String, base_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: normalize_base(base_url, DEFAULT_BASE_URL),
            api_key,
            model,
        }
    }

    fn request<'a>(&'a self, prompt: &'a str, image: &[u8], mime_type: &str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:{};base64,{}", mime_type, encode_image(image)),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        }
    }
}

fn answer_text(response: ChatResponse) -> ProviderResult<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))?;
    primary_text(choice.message.content, "first choice")
}

#[async_trait]
impl AnswerProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn answer(&self, prompt: &str, image: &[u8], mime_type: &str) -> ProviderResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Sending vision request to OpenAI: model={}", self.model);

        let response: ChatResponse = send_json(
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&self.request(prompt, image, mime_type)),
        )
        .await?;

        answer_text(response)
    }
}
