// src/provider/mod.rs — Generation client layer

pub mod openai;
pub mod retry;
pub mod roles;
pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::WorkbenchError;

/// The one call the engine makes to the outside world: prompt in, text out.
///
/// Implementations own transport concerns (HTTP, auth, timeouts). Any failure
/// they return should be one of the transport variants of [`WorkbenchError`].
#[async_trait]
pub trait GenerationClient: Send + Sync {
    fn id(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, WorkbenchError>;
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    /// Model that actually answered; providers may report a dated snapshot name.
    pub model_used: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl std::str::FromStr for ReasoningEffort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            other => Err(format!("unknown reasoning effort '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_new_defaults() {
        let r = GenerationRequest::new("hello", "gpt-5-mini");
        assert_eq!(r.prompt, "hello");
        assert_eq!(r.model, "gpt-5-mini");
        assert!(r.temperature.is_none());
        assert!(r.max_output_tokens.is_none());
        assert!(r.reasoning_effort.is_none());
    }

    #[test]
    fn test_token_usage_total() {
        let u = TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
        };
        assert_eq!(u.total(), 150);
        assert_eq!(TokenUsage::default().total(), 0);
    }

    #[test]
    fn test_reasoning_effort_parse() {
        assert_eq!("Medium".parse::<ReasoningEffort>(), Ok(ReasoningEffort::Medium));
        assert_eq!(" low ".parse::<ReasoningEffort>(), Ok(ReasoningEffort::Low));
        assert!("max".parse::<ReasoningEffort>().is_err());
        assert_eq!(ReasoningEffort::High.as_str(), "high");
    }
}
