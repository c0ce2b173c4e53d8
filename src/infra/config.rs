// src/infra/config.rs — Configuration loading (TOML + environment overrides)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::WorkbenchError;
use crate::infra::paths;
use crate::provider::ReasoningEffort;

/// Smallest accepted value for `VERBOSE_LLM_LOG_MAX_CHARS`.
pub const MIN_VERBOSE_LOG_CHARS: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Concrete model identifiers behind the logical "premium" / "budget" slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub premium: Option<String>,
    pub budget: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    pub premium_reasoning_effort: Option<ReasoningEffort>,
    pub budget_reasoning_effort: Option<ReasoningEffort>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            premium: None,
            budget: None,
            base_url: default_base_url(),
            api_key: None,
            premium_reasoning_effort: None,
            budget_reasoning_effort: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub additive_temperature: Option<f32>,
    pub reductive_temperature: Option<f32>,
    pub max_output_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            additive_temperature: None,
            reductive_temperature: None,
            max_output_tokens: 1200,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 2_000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub verbose_llm: bool,
    pub verbose_llm_max_chars: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            verbose_llm: false,
            verbose_llm_max_chars: 4000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Prepend the format guidance block when a template never mentions the format.
    #[serde(default)]
    pub prepend_format_guidance: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub sessions_dir: Option<String>,
}

impl StorageConfig {
    pub fn resolve_sessions_dir(&self) -> PathBuf {
        match self.sessions_dir {
            Some(ref dir) => paths::expand_home(dir),
            None => paths::sessions_dir(),
        }
    }
}

impl Config {
    /// Load config from file (falling back to defaults), then apply environment overrides.
    pub fn load() -> Result<Self, WorkbenchError> {
        let path = paths::config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_with(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, WorkbenchError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| WorkbenchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply environment overrides through `lookup`, so callers (and tests) choose the source.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), WorkbenchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.models.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.models.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("PREMIUM_LLM_MODEL") {
            self.models.premium = Some(model.trim().to_string());
        }
        if let Some(model) = get("BUDGET_LLM_MODEL") {
            self.models.budget = Some(model.trim().to_string());
        }
        if let Some(v) = get("PREMIUM_LLM_REASONING_EFFORT") {
            self.models.premium_reasoning_effort =
                Some(parse_effort("PREMIUM_LLM_REASONING_EFFORT", &v)?);
        }
        if let Some(v) = get("BUDGET_LLM_REASONING_EFFORT") {
            self.models.budget_reasoning_effort =
                Some(parse_effort("BUDGET_LLM_REASONING_EFFORT", &v)?);
        }
        if let Some(v) = get("ADD_LLM_TEMP") {
            self.generation.additive_temperature = Some(parse_temperature("ADD_LLM_TEMP", &v)?);
        }
        if let Some(v) = get("RED_LLM_TEMP") {
            self.generation.reductive_temperature = Some(parse_temperature("RED_LLM_TEMP", &v)?);
        }
        if let Some(v) = get("VERBOSE_LLM_LOGGING") {
            self.logging.verbose_llm = parse_bool("VERBOSE_LLM_LOGGING", &v)?;
        }
        if let Some(v) = get("VERBOSE_LLM_LOG_MAX_CHARS") {
            self.logging.verbose_llm_max_chars = parse_max_chars("VERBOSE_LLM_LOG_MAX_CHARS", &v)?;
        }
        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, WorkbenchError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(WorkbenchError::Config(format!(
            "{name} must be a boolean (true/false), got '{other}'"
        ))),
    }
}

fn parse_temperature(name: &str, value: &str) -> Result<f32, WorkbenchError> {
    let t: f32 = value
        .trim()
        .parse()
        .map_err(|_| WorkbenchError::Config(format!("{name} must be a number, got '{value}'")))?;
    if !(0.0..=2.0).contains(&t) {
        return Err(WorkbenchError::Config(format!(
            "{name} must be between 0.0 and 2.0, got {t}"
        )));
    }
    Ok(t)
}

fn parse_max_chars(name: &str, value: &str) -> Result<usize, WorkbenchError> {
    let n: usize = value
        .trim()
        .parse()
        .map_err(|_| WorkbenchError::Config(format!("{name} must be an integer, got '{value}'")))?;
    if n < MIN_VERBOSE_LOG_CHARS {
        return Err(WorkbenchError::Config(format!(
            "{name} must be >= {MIN_VERBOSE_LOG_CHARS}, got {n}"
        )));
    }
    Ok(n)
}

fn parse_effort(name: &str, value: &str) -> Result<ReasoningEffort, WorkbenchError> {
    value.parse().map_err(|_| {
        WorkbenchError::Config(format!(
            "{name} must be one of low, medium, high; got '{value}'"
        ))
    })
}
