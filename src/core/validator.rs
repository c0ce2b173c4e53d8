// src/core/validator.rs — Per-format structural validation

use super::formats::OutputFormat;
use super::types::Validation;

/// Check a candidate output against its declared format.
///
/// Never modifies the candidate. Soft formats always pass.
pub fn validate(candidate: &str, format: OutputFormat) -> Validation {
    let strategy: fn(&str) -> Validation = match format {
        OutputFormat::Json => validate_json,
        OutputFormat::Markdown | OutputFormat::Code | OutputFormat::Text => accept,
    };
    strategy(candidate)
}

fn validate_json(candidate: &str) -> Validation {
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(_) => Validation::Passed,
        Err(e) => Validation::Failed {
            reason: format!("Invalid JSON: {e}"),
        },
    }
}

fn accept(_: &str) -> Validation {
    Validation::Passed
}
