// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for snapsolve

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::{Result, SnapsolveError};

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// API key for the selected provider
    #[serde(default)]
    pub api_key: String,

    /// Which provider answers the screenshots
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model name passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Directory watched for new screenshots
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: String,

    /// Prompt sent alongside every screenshot (a list of lines is joined with newlines)
    #[serde(default = "default_prompt", deserialize_with = "prompt_text")]
    pub prompt: String,

    /// Fire desktop notifications on completion and error
    #[serde(default = "default_true")]
    pub enable_notifications: bool,

    /// Markdown document the answers are written to
    #[serde(default = "default_answers_file")]
    pub answers_file: String,

    /// JSON status record polled by the viewer
    #[serde(default = "default_status_file")]
    pub status_file: String,

    /// Where answered screenshots are moved
    #[serde(default = "default_processed_dir")]
    pub processed_dir: String,

    /// Upper bound for one provider call; 0 disables the bound
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Override for the provider's API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Viewer settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

/// Supported answer providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider '{}'. Use 'openai', 'anthropic', or 'gemini'",
                other
            )),
        }
    }
}

impl TryFrom<String> for ProviderKind {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProviderKind> for String {
    fn from(kind: ProviderKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PromptLines {
    Single(String),
    Lines(Vec<String>),
}

fn prompt_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PromptLines::deserialize(deserializer)? {
        PromptLines::Single(text) => text,
        PromptLines::Lines(lines) => lines.join("\n"),
    })
}

// Default value functions
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_true() -> bool { true }
fn default_answers_file() -> String { "answers.md".to_string() }
fn default_status_file() -> String { "status.json".to_string() }
fn default_processed_dir() -> String { "_processed".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_web_host() -> String { "127.0.0.1".to_string() }
fn default_web_port() -> u16 { 8080 }

fn default_prompt() -> String {
    "Analyze this screenshot. If there is a question in the image, extract it and provide \
     a clear, concise answer. If there are multiple questions, answer all of them. Format \
     your response as:\n\nQuestion: [extracted question]\nAnswer: [your answer]\n\nIf \
     there's no question in the image, just describe what you see."
        .to_string()
}

/// Where the OS drops screenshots by default
fn default_screenshots_dir() -> String {
    let dir = if cfg!(target_os = "macos") {
        dirs::desktop_dir()
    } else {
        dirs::picture_dir().map(|p| p.join("Screenshots"))
    };

    dir.or_else(|| dirs::home_dir().map(|h| h.join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("."))
        .to_string_lossy()
        .into_owned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            provider: ProviderKind::default(),
            model: default_model(),
            screenshots_dir: default_screenshots_dir(),
            prompt: default_prompt(),
            enable_notifications: true,
            answers_file: default_answers_file(),
            status_file: default_status_file(),
            processed_dir: default_processed_dir(),
            request_timeout_secs: default_timeout(),
            api_base: None,
            web: WebConfig::default(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, writing a default one first if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| SnapsolveError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(path)?;
            tracing::warn!("Config file not found, created {:?} - please add your API key", path);
            Ok(config)
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations the pipeline cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SnapsolveError::Config(
                "api_key is empty - add your API key to the configuration file".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(SnapsolveError::Config("model is empty".to_string()));
        }
        Ok(())
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        PathBuf::from(&self.screenshots_dir)
    }

    pub fn answers_path(&self) -> PathBuf {
        PathBuf::from(&self.answers_file)
    }

    pub fn status_path(&self) -> PathBuf {
        PathBuf::from(&self.status_file)
    }

    pub fn processed_dir(&self) -> PathBuf {
        PathBuf::from(&self.processed_dir)
    }

    /// Provider call bound, `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_synthesized_and_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = AppConfig::load(&path).unwrap();

        assert!(path.exists());
        assert!(config.api_key.is_empty());
        assert!(config.enable_notifications);
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["provider"], "openai");
        assert_eq!(written["model"], "gpt-4o-mini");
    }

    #[test]
    fn test_prompt_lines_are_joined() {
        let config: AppConfig = serde_json::from_str(
            r#"{"api_key": "k", "provider": "gemini", "prompt": ["first", "second"]}"#,
        )
        .unwrap();
        assert_eq!(config.prompt, "first\nsecond");
        assert_eq!(config.provider, ProviderKind::Gemini);
    }

    #[test]
    fn test_provider_is_case_insensitive() {
        let config: AppConfig =
            serde_json::from_str(r#"{"api_key": "k", "provider": "Anthropic"}"#).unwrap();
        assert_eq!(config.provider, ProviderKind::Anthropic);
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_key": "k", "provider": "ollama"}"#).unwrap();

        match AppConfig::load(&path) {
            Err(SnapsolveError::Config(msg)) => assert!(msg.contains("ollama")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_api_key_fails_validation() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(SnapsolveError::Config(_))));

        let config = AppConfig { api_key: "sk-test".to_string(), ..AppConfig::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let config = AppConfig { request_timeout_secs: 0, ..AppConfig::default() };
        assert_eq!(config.request_timeout(), None);
        assert_eq!(AppConfig::default().request_timeout(), Some(Duration::from_secs(120)));
    }
}
