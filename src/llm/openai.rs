//! OpenAI-compatible chat completions provider.

use crate::error::AnalysisError;
use crate::llm::parse::parse_analysis_response;
use crate::llm::prompt::{analysis_prompt, SYSTEM_PROMPT};
use crate::llm::{NewsAnalyzer, ProviderConfig};
use crate::models::AnalysisOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Analyzer for any endpoint speaking the OpenAI chat completions API.
pub struct OpenAiAnalyzer {
    config: ProviderConfig,
    http_client: reqwest::Client,
}

impl OpenAiAnalyzer {
    pub fn new(config: ProviderConfig) -> Result<Self, AnalysisError> {
        info!(
            "Initializing OpenAI-compatible analyzer with model {} at {}",
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

    async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request = CompletionRequest {
            model: &self.config.model_name,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: json!({ "type": "json_object" }),
        };

        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
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

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Malformed(format!("completion response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AnalysisError::Malformed("empty completion".to_string()))
    }
}

#[async_trait]
impl NewsAnalyzer for OpenAiAnalyzer {
    async fn analyze(&self, title: &str, body: &str) -> AnalysisOutcome {
        let prompt = analysis_prompt(title, body);
        match self.complete(&prompt).await {
            Ok(content) => {
                debug!("Completion: {}", content);
                parse_analysis_response(&content)
            }
            Err(e) => AnalysisOutcome::failure(e.to_string()),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}
