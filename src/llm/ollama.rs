//! Ollama chat API provider.

use crate::error::AnalysisError;
use crate::llm::parse::parse_analysis_response;
use crate::llm::prompt::{analysis_prompt, SYSTEM_PROMPT};
use crate::llm::{NewsAnalyzer, ProviderConfig};
use crate::models::AnalysisOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Analyzer backed by a local or remote Ollama server.
pub struct OllamaAnalyzer {
    config: ProviderConfig,
    http_client: reqwest::Client,
}

impl OllamaAnalyzer {
    pub fn new(config: ProviderConfig) -> Result<Self, AnalysisError> {
        info!(
            "Initializing Ollama analyzer with model {} at {}",
            config.model_name, config.base_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn send_prompt(&self, prompt: String) -> Result<String, AnalysisError> {
        let url = format!("{}/api/chat", self.config.base_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    AnalysisError::Connect(self.config.base_url.clone())
                } else {
                    AnalysisError::Request(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Api { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Malformed(format!("Ollama response: {}", e)))?;

        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl NewsAnalyzer for OllamaAnalyzer {
    async fn analyze(&self, title: &str, body: &str) -> AnalysisOutcome {
        match self.send_prompt(analysis_prompt(title, body)).await {
            Ok(content) => {
                debug!("Ollama response: {}", content);
                parse_analysis_response(&content)
            }
            Err(e) => AnalysisOutcome::failure(e.to_string()),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
