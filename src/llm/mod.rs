//! Analysis adapters backed by language models.
//!
//! The pipeline only sees the [`NewsAnalyzer`] trait. Each provider maps its
//! own request/response shape and errors onto an [`AnalysisOutcome`].

pub mod ollama;
pub mod openai;
pub mod parse;
pub mod prompt;

pub use ollama::OllamaAnalyzer;
pub use openai::OpenAiAnalyzer;

use crate::models::AnalysisOutcome;
use async_trait::async_trait;

/// Extracts a symbol and directional signal from one news item.
///
/// Implementations must be safe to call concurrently and keep no
/// per-call state between invocations.
#[async_trait]
pub trait NewsAnalyzer: Send + Sync {
    /// Analyze a headline and body.
    async fn analyze(&self, title: &str, body: &str) -> AnalysisOutcome;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Connection settings shared by the model providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model_name: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 1000,
            timeout_seconds: 60,
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted analyzer for exercising the worker pool and pipeline.

    use super::*;
    use crate::models::{AnalysisPayload, Origin, RawItem};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted behaviour for one title.
    #[derive(Debug, Clone)]
    pub enum Step {
        Success(AnalysisPayload),
        NoSymbol,
        Fail,
        Panic,
        Delayed(Duration, Box<Step>),
    }

    impl Step {
        pub fn success(symbol: &str, direction: &str, impact: i64, confidence: f64) -> Self {
            Step::Success(AnalysisPayload {
                symbol: symbol.to_string(),
                event_category: "Other".to_string(),
                direction: direction.to_string(),
                impact_strength: impact,
                confidence,
                rationale: format!("{} {} x{}", symbol, direction, impact),
            })
        }

        pub fn delayed(delay: Duration, then: Step) -> Self {
            Step::Delayed(delay, Box::new(then))
        }
    }

    /// Analyzer that replays a fixed script keyed by title.
    /// Unknown titles yield `NoSymbol`.
    #[derive(Debug, Default)]
    pub struct ScriptedAnalyzer {
        steps: HashMap<String, Step>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    impl ScriptedAnalyzer {
        pub fn on(mut self, title: &str, step: Step) -> Self {
            self.steps.insert(title.to_string(), step);
            self
        }

        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NewsAnalyzer for ScriptedAnalyzer {
        async fn analyze(&self, title: &str, _body: &str) -> AnalysisOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let mut step = self.steps.get(title).cloned().unwrap_or(Step::NoSymbol);
            let outcome = loop {
                match step {
                    Step::Delayed(delay, then) => {
                        tokio::time::sleep(delay).await;
                        step = *then;
                    }
                    Step::Success(payload) => break AnalysisOutcome::Success(payload),
                    Step::NoSymbol => break AnalysisOutcome::NoSymbol,
                    Step::Fail => break AnalysisOutcome::failure("scripted failure"),
                    Step::Panic => panic!("scripted panic"),
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            outcome
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub fn raw_item(title: &str) -> RawItem {
        RawItem {
            title: title.to_string(),
            body: format!("{} body", title),
            published_at: Utc::now(),
            url: format!("https://news.example/{}", title.replace(' ', "-")),
            origin: Origin::Rss,
        }
    }
}
