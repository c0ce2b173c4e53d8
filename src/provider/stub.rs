// src/provider/stub.rs — Deterministic offline client for dry runs

use async_trait::async_trait;

use super::{Generation, GenerationClient, GenerationRequest, TokenUsage};
use crate::infra::errors::WorkbenchError;

/// Echoes the prompt back, tagged with the model it was routed to.
/// Lets a session's templates and sequencing be exercised without network access.
#[derive(Debug, Default, Clone)]
pub struct StubClient;

impl StubClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationClient for StubClient {
    fn id(&self) -> &str {
        "stub"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, WorkbenchError> {
        let text = format!("[stub:{}] {}", request.model, request.prompt)
            .trim()
            .to_string();
        Ok(Generation {
            usage: TokenUsage {
                input_tokens: request.prompt.split_whitespace().count() as u32,
                output_tokens: text.split_whitespace().count() as u32,
            },
            text,
            model_used: request.model,
        })
    }
}
