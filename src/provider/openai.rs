// src/provider/openai.rs — OpenAI-compatible chat-completions client

use std::time::Duration;

use async_trait::async_trait;

use super::{Generation, GenerationClient, GenerationRequest, TokenUsage};
use crate::infra::errors::WorkbenchError;
use crate::util::truncate_str;

const PROVIDER_ID: &str = "openai";

pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    /// When set, prompts and responses are logged at debug, truncated to this many bytes.
    verbose_max_chars: Option<usize>,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, WorkbenchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WorkbenchError::Config(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            verbose_max_chars: None,
        })
    }

    pub fn with_verbose_logging(mut self, max_chars: usize) -> Self {
        self.verbose_max_chars = Some(max_chars);
        self
    }

    fn build_body(request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "user", "content": request.prompt },
            ],
        });
        if let Some(max_tokens) = request.max_output_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(effort) = request.reasoning_effort {
            body["reasoning_effort"] = serde_json::json!(effort.as_str());
        }
        body
    }
}

/// Parse a `Retry-After` header value (seconds) into milliseconds.
fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
        .unwrap_or(5000)
}

fn parse_generation(resp: &serde_json::Value, requested_model: &str) -> Result<Generation, WorkbenchError> {
    let content = resp["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| WorkbenchError::Provider {
            provider: PROVIDER_ID.into(),
            message: "Failed to parse response: missing choices[0].message.content".into(),
            retriable: false,
        })?;

    let model_used = resp["model"]
        .as_str()
        .filter(|m| !m.is_empty())
        .unwrap_or(requested_model)
        .to_string();

    let usage = TokenUsage {
        input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(Generation {
        text: content.to_string(),
        model_used,
        usage,
    })
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, WorkbenchError> {
        if let Some(max) = self.verbose_max_chars {
            tracing::debug!(
                model = %request.model,
                "LLM request prompt:\n{}",
                truncate_str(&request.prompt, max)
            );
        }

        let body = Self::build_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WorkbenchError::Timeout {
                        provider: PROVIDER_ID.into(),
                    }
                } else {
                    WorkbenchError::Provider {
                        provider: PROVIDER_ID.into(),
                        message: e.to_string(),
                        retriable: e.is_connect(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(WorkbenchError::RateLimited {
                provider: PROVIDER_ID.into(),
                retry_after_ms: retry_after_ms(response.headers()),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let error_body = response.text().await.unwrap_or_default();
            return Err(WorkbenchError::Auth {
                provider: PROVIDER_ID.into(),
                message: format!("HTTP {}: {}", status, error_body),
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(WorkbenchError::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| WorkbenchError::Provider {
                    provider: PROVIDER_ID.into(),
                    message: format!("Failed to parse response: {}", e),
                    retriable: false,
                })?;

        let generation = parse_generation(&resp, &request.model)?;

        if let Some(max) = self.verbose_max_chars {
            tracing::debug!(
                model = %generation.model_used,
                input_tokens = generation.usage.input_tokens,
                output_tokens = generation.usage.output_tokens,
                "LLM response text:\n{}",
                truncate_str(&generation.text, max)
            );
        }

        Ok(generation)
    }
}
