// src/core/types.rs — Core domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::defaults;
use super::formats::OutputFormat;
use super::history::History;
use crate::infra::errors::FailureKind;

/// Persisted representation version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// The full reproducible state of one workbench project.
///
/// Owned by the caller; the engine borrows it mutably for the duration of a
/// step, which is what keeps two phases from ever touching it at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub schema_version: u32,
    #[serde(default)]
    pub title: String,
    pub outcome: String,
    pub requirements: String,
    pub special_resources: String,
    pub format: OutputFormat,
    pub additive_policy: String,
    pub reductive_policy: String,
    pub additive_template: String,
    pub reductive_template: String,
    pub iterations_requested: u32,
    #[serde(default)]
    pub additive_tier: ModelTier,
    #[serde(default)]
    pub reductive_tier: ModelTier,
    pub current_output: String,
    pub history: History,
}

impl Session {
    /// A fresh session with baseline templates and phase rules.
    pub fn new(outcome: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            title: String::new(),
            outcome: outcome.into(),
            requirements: String::new(),
            special_resources: String::new(),
            format,
            additive_policy: defaults::ADDITIVE_POLICY.to_string(),
            reductive_policy: defaults::REDUCTIVE_POLICY.to_string(),
            additive_template: defaults::ADDITIVE_TEMPLATE.to_string(),
            reductive_template: defaults::REDUCTIVE_TEMPLATE.to_string(),
            iterations_requested: 1,
            additive_tier: ModelTier::Budget,
            reductive_tier: ModelTier::Budget,
            current_output: String::new(),
            history: History::default(),
        }
    }

    pub fn template_for(&self, phase: Phase) -> &str {
        match phase {
            Phase::Additive => &self.additive_template,
            Phase::Reductive => &self.reductive_template,
        }
    }

    pub fn policy_for(&self, phase: Phase) -> &str {
        match phase {
            Phase::Additive => &self.additive_policy,
            Phase::Reductive => &self.reductive_policy,
        }
    }

    pub fn tier_for(&self, phase: Phase) -> ModelTier {
        match phase {
            Phase::Additive => self.additive_tier,
            Phase::Reductive => self.reductive_tier,
        }
    }

    /// True when `current_output` no longer matches the last recorded phase output.
    pub fn has_manual_edit(&self) -> bool {
        match self.history.last() {
            Some(entry) => entry.output_after != self.current_output,
            None => !self.current_output.is_empty(),
        }
    }

    /// Display name: the title when set, otherwise the outcome's first line.
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if !title.is_empty() {
            return title;
        }
        self.outcome.lines().next().unwrap_or("").trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Additive,
    Reductive,
}

impl Phase {
    /// Lowercase name, as substituted for the `PHASE_NAME` token.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Additive => "additive",
            Phase::Reductive => "reductive",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Additive => f.write_str("ADDITIVE"),
            Phase::Reductive => f.write_str("REDUCTIVE"),
        }
    }
}

/// Logical model slot. Resolved to a concrete id by `provider::roles::ModelSlots`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Budget,
    Premium,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Budget => f.write_str("budget"),
            ModelTier::Premium => f.write_str("premium"),
        }
    }
}

/// One planned phase execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    pub iteration: u32,
    pub phase: Phase,
    /// 1-based position in the session's overall phase sequence.
    pub step_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "UPPERCASE")]
pub enum Validation {
    Skipped,
    Passed,
    Failed { reason: String },
}

impl Validation {
    pub fn is_failed(&self) -> bool {
        matches!(self, Validation::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Validation::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validation::Skipped => f.write_str("SKIPPED"),
            Validation::Passed => f.write_str("PASSED"),
            Validation::Failed { reason } => write!(f, "FAILED({reason})"),
        }
    }
}

/// An executed phase. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub iteration_index: u32,
    pub phase_step_index: u32,
    pub phase: Phase,
    pub tier: ModelTier,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
    pub rendered_prompt: String,
    pub output_before: String,
    pub output_after: String,
    #[serde(rename = "validationResult")]
    pub validation: Validation,
}

impl HistoryEntry {
    pub fn step(&self) -> PhaseStep {
        PhaseStep {
            iteration: self.iteration_index,
            phase: self.phase,
            step_index: self.phase_step_index,
        }
    }
}

/// Partial information about a phase that failed in transport.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortInfo {
    pub iteration: u32,
    pub phase: Phase,
    pub model: String,
    pub rendered_prompt: String,
    pub message: String,
    pub kind: Option<FailureKind>,
}

impl std::fmt::Display for AbortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "iteration {} {} aborted ({}, model {}): {}",
            self.iteration,
            self.phase,
            self.kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "error".into()),
            self.model,
            self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    Idle,
    Running { iteration: u32, phase: Phase },
    Completed,
    Aborted(AbortInfo),
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, EngineState::Running { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Aborted(AbortInfo),
    Cancelled { iteration: u32, phase: Phase },
}

/// Summary of a `run` / `resume` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub phases_completed: usize,
    pub validation_warnings: usize,
}

/// Events emitted to the interface layer while a run progresses.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        first_iteration: u32,
        total_phases: usize,
    },
    PhaseStarted {
        step: PhaseStep,
        model: String,
    },
    PhaseCompleted(HistoryEntry),
    ValidationWarning {
        iteration: u32,
        phase: Phase,
        reason: String,
    },
    Aborted(AbortInfo),
    Cancelled {
        iteration: u32,
        phase: Phase,
    },
    Completed {
        phases: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Session ────────────────────────────────────────────────

    #[test]
    fn test_new_session_defaults() {
        let s = Session::new("Skin Cream Formulation", OutputFormat::Text);
        assert_eq!(s.schema_version, SCHEMA_VERSION);
        assert_eq!(s.iterations_requested, 1);
        assert!(s.history.is_empty());
        assert!(s.current_output.is_empty());
        assert_eq!(s.tier_for(Phase::Additive), ModelTier::Budget);
        assert!(s.template_for(Phase::Reductive).contains("{{CURRENT_OUTPUT}}"));
        assert!(!s.has_manual_edit());
    }

    #[test]
    fn test_display_title_falls_back_to_outcome() {
        let mut s = Session::new("Lip balm\nwith beeswax", OutputFormat::Text);
        assert_eq!(s.display_title(), "Lip balm");
        s.title = "  Balm v2 ".into();
        assert_eq!(s.display_title(), "Balm v2");
    }

    #[test]
    fn test_manual_edit_on_empty_history() {
        let mut s = Session::new("x", OutputFormat::Text);
        s.current_output = "seed draft".into();
        assert!(s.has_manual_edit());
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let s = Session::new("x", OutputFormat::Json);
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["schemaVersion"], 1);
        assert_eq!(v["format"], "JSON");
        assert_eq!(v["iterationsRequested"], 1);
        assert_eq!(v["additiveTier"], "budget");
        assert!(v["history"].as_array().unwrap().is_empty());
    }

    // ─── Enums ──────────────────────────────────────────────────

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Additive.name(), "additive");
        assert_eq!(Phase::Reductive.to_string(), "REDUCTIVE");
        assert_eq!(
            serde_json::to_string(&Phase::Additive).unwrap(),
            "\"ADDITIVE\""
        );
    }

    #[test]
    fn test_validation_serde_shape() {
        let failed = Validation::Failed {
            reason: "Invalid JSON: EOF".into(),
        };
        let v = serde_json::to_value(&failed).unwrap();
        assert_eq!(v["status"], "FAILED");
        assert_eq!(v["reason"], "Invalid JSON: EOF");
        let skipped = serde_json::to_value(Validation::Skipped).unwrap();
        assert_eq!(skipped, serde_json::json!({ "status": "SKIPPED" }));
        assert_eq!(failed.to_string(), "FAILED(Invalid JSON: EOF)");
        assert_eq!(failed.reason(), Some("Invalid JSON: EOF"));
        assert!(Validation::Passed.reason().is_none());
    }

    #[test]
    fn test_abort_info_display() {
        let info = AbortInfo {
            iteration: 2,
            phase: Phase::Additive,
            model: "gpt-5-mini".into(),
            rendered_prompt: "p".into(),
            message: "HTTP 503".into(),
            kind: Some(FailureKind::Server),
        };
        assert_eq!(
            info.to_string(),
            "iteration 2 ADDITIVE aborted (server, model gpt-5-mini): HTTP 503"
        );
    }
}
