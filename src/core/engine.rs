// src/core/engine.rs — Iteration engine
//
// Drives the additive/reductive sequence for one session: render the phase
// template, call the generation client, validate, record, update the draft.
// Exactly one phase is in flight at a time; the engine only suspends while
// awaiting the client.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::sequence::{plan_from, tier_for, tiers_needed, PHASE_ORDER};
use super::template::{inspect_template, render_phase, PromptContext};
use super::types::*;
use super::validator::validate;
use crate::infra::config::Config;
use crate::infra::errors::WorkbenchError;
use crate::provider::roles::ModelSlots;
use crate::provider::{GenerationClient, GenerationRequest};

/// Per-run generation knobs that are not part of the session.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub additive_temperature: Option<f32>,
    pub reductive_temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub prepend_format_guidance: bool,
    pub validation_enabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            additive_temperature: None,
            reductive_temperature: None,
            max_output_tokens: None,
            prepend_format_guidance: false,
            validation_enabled: true,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            additive_temperature: config.generation.additive_temperature,
            reductive_temperature: config.generation.reductive_temperature,
            max_output_tokens: Some(config.generation.max_output_tokens),
            prepend_format_guidance: config.prompts.prepend_format_guidance,
            validation_enabled: config.validation.enabled,
        }
    }

    fn temperature_for(&self, phase: Phase) -> Option<f32> {
        match phase {
            Phase::Additive => self.additive_temperature,
            Phase::Reductive => self.reductive_temperature,
        }
    }
}

/// Cloneable handle for cancelling the in-flight phase from another task.
///
/// A cancel only affects the run that is current when it is requested;
/// every `begin` / `resume` arms a fresh token.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.current().cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.current().is_cancelled()
    }

    fn current(&self) -> CancellationToken {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn rearm(&self) {
        let mut guard = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = CancellationToken::new();
    }
}

/// Result of a single `step`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The phase completed and this entry was appended.
    Recorded(HistoryEntry),
    Aborted(AbortInfo),
    Cancelled { iteration: u32, phase: Phase },
}

pub struct Engine {
    client: Arc<dyn GenerationClient>,
    slots: ModelSlots,
    settings: EngineSettings,
    state: EngineState,
    plan: Vec<PhaseStep>,
    /// Index into `plan` of the next step to execute.
    cursor: usize,
    cancel: CancelHandle,
    /// Optional callback for real-time progress events.
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send>>,
}

impl Engine {
    pub fn new(client: Arc<dyn GenerationClient>, slots: ModelSlots) -> Self {
        Self {
            client,
            slots,
            settings: EngineSettings::default(),
            state: EngineState::Idle,
            plan: Vec::new(),
            cursor: 0,
            cancel: CancelHandle::default(),
            on_progress: None,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// The next step `step` would execute, if any.
    pub fn next_step(&self) -> Option<PhaseStep> {
        self.plan.get(self.cursor).copied()
    }

    /// Steps of the current plan not yet completed.
    pub fn remaining_steps(&self) -> &[PhaseStep] {
        self.plan.get(self.cursor..).unwrap_or(&[])
    }

    /// Drop any planned or interrupted run and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = EngineState::Idle;
        self.plan.clear();
        self.cursor = 0;
    }

    /// Plan a run of `session.iterations_requested` iterations.
    ///
    /// Every check happens before any state changes, so a refused start
    /// leaves the engine exactly where it was.
    pub fn begin(&mut self, session: &Session) -> Result<(), WorkbenchError> {
        if self.state.is_running() {
            return Err(WorkbenchError::RunInProgress);
        }
        let n = session.iterations_requested;
        if n < 1 {
            return Err(WorkbenchError::InvalidIterations(n));
        }
        for phase in PHASE_ORDER {
            if session.template_for(phase).trim().is_empty() {
                return Err(WorkbenchError::Config(format!(
                    "{} prompt template is empty",
                    phase.name()
                )));
            }
        }

        let first = session.history.max_iteration() + 1;
        let plan = plan_from(first, n);
        for tier in tiers_needed(session, &plan) {
            self.slots.resolve(tier)?;
        }

        for phase in PHASE_ORDER {
            for warning in inspect_template(session.template_for(phase)).warnings() {
                tracing::warn!(phase = phase.name(), "Template: {}", warning);
            }
        }

        tracing::info!(
            iterations = n,
            first_iteration = first,
            format = %session.format,
            client = self.client.id(),
            "Starting run"
        );

        self.cancel.rearm();
        self.state = EngineState::Running {
            iteration: plan[0].iteration,
            phase: plan[0].phase,
        };
        self.emit(ProgressEvent::RunStarted {
            first_iteration: first,
            total_phases: plan.len(),
        });
        self.plan = plan;
        self.cursor = 0;
        Ok(())
    }

    /// Execute the next planned phase against `session`.
    ///
    /// Between steps the caller may overwrite `session.current_output`; the
    /// next phase sees the edited value.
    pub async fn step(&mut self, session: &mut Session) -> Result<StepOutcome, WorkbenchError> {
        if !self.state.is_running() {
            return Err(WorkbenchError::NotRunning);
        }
        let Some(step) = self.next_step() else {
            return Err(WorkbenchError::NotRunning);
        };

        let token = self.cancel.current();
        if token.is_cancelled() {
            return Ok(self.cancelled(step));
        }

        let ctx = PromptContext::for_phase(session, step.iteration, step.phase);
        let rendered = render_phase(
            session.template_for(step.phase),
            &ctx,
            session.format,
            self.settings.prepend_format_guidance,
        );
        let tier = tier_for(session, &step);
        let slot = match self.slots.resolve(tier) {
            Ok(slot) => slot.clone(),
            Err(e) => {
                self.state = EngineState::Idle;
                return Err(e);
            }
        };

        self.emit(ProgressEvent::PhaseStarted {
            step,
            model: slot.model.clone(),
        });
        tracing::debug!(
            iteration = step.iteration,
            phase = step.phase.name(),
            model = %slot.model,
            prompt_len = rendered.len(),
            "Running phase"
        );

        let request = GenerationRequest {
            prompt: rendered.clone(),
            model: slot.model.clone(),
            temperature: self.settings.temperature_for(step.phase),
            max_output_tokens: self.settings.max_output_tokens,
            reasoning_effort: slot.reasoning_effort,
        };
        let client = Arc::clone(&self.client);
        let result = tokio::select! {
            _ = token.cancelled() => None,
            r = client.generate(request) => Some(r),
        };

        let generation = match result {
            None => return Ok(self.cancelled(step)),
            Some(Err(e)) => {
                let info = AbortInfo {
                    iteration: step.iteration,
                    phase: step.phase,
                    model: slot.model,
                    rendered_prompt: rendered,
                    message: e.to_string(),
                    kind: e.failure_kind(),
                };
                tracing::error!(
                    iteration = info.iteration,
                    phase = info.phase.name(),
                    model = %info.model,
                    "Generation failed, aborting run: {}",
                    info.message
                );
                self.state = EngineState::Aborted(info.clone());
                self.emit(ProgressEvent::Aborted(info.clone()));
                return Ok(StepOutcome::Aborted(info));
            }
            Some(Ok(generation)) => generation,
        };

        let validation = if self.settings.validation_enabled {
            validate(&generation.text, session.format)
        } else {
            Validation::Skipped
        };
        if let Some(reason) = validation.reason() {
            tracing::warn!(
                iteration = step.iteration,
                phase = step.phase.name(),
                "Output failed {} validation: {}",
                session.format,
                reason
            );
            self.emit(ProgressEvent::ValidationWarning {
                iteration: step.iteration,
                phase: step.phase,
                reason: reason.to_string(),
            });
        }

        let entry = HistoryEntry {
            iteration_index: step.iteration,
            phase_step_index: step.step_index,
            phase: step.phase,
            tier,
            model_used: generation.model_used,
            timestamp: Utc::now(),
            rendered_prompt: rendered,
            output_before: session.current_output.clone(),
            output_after: generation.text.clone(),
            validation,
        };
        session.history.append(entry.clone());
        session.current_output = generation.text;

        tracing::debug!(
            iteration = step.iteration,
            phase = step.phase.name(),
            input_tokens = generation.usage.input_tokens,
            output_tokens = generation.usage.output_tokens,
            "Phase complete"
        );
        self.emit(ProgressEvent::PhaseCompleted(entry.clone()));

        self.cursor += 1;
        self.state = match self.next_step() {
            Some(next) => EngineState::Running {
                iteration: next.iteration,
                phase: next.phase,
            },
            None => {
                tracing::info!(phases = self.plan.len(), "Run complete");
                self.emit(ProgressEvent::Completed {
                    phases: self.plan.len(),
                });
                EngineState::Completed
            }
        };
        Ok(StepOutcome::Recorded(entry))
    }

    /// `begin` then step until the run completes, aborts or is cancelled.
    pub async fn run(&mut self, session: &mut Session) -> Result<RunReport, WorkbenchError> {
        self.begin(session)?;
        self.drive(session).await
    }

    /// Continue the remaining steps of an aborted or cancelled run.
    /// The interrupted phase is attempted afresh.
    pub async fn resume(&mut self, session: &mut Session) -> Result<RunReport, WorkbenchError> {
        match self.state {
            EngineState::Running { .. } => return Err(WorkbenchError::RunInProgress),
            EngineState::Completed => return Err(WorkbenchError::NothingToResume),
            EngineState::Idle | EngineState::Aborted(_) => {}
        }
        let Some(next) = self.next_step() else {
            return Err(WorkbenchError::NothingToResume);
        };

        tracing::info!(
            iteration = next.iteration,
            phase = next.phase.name(),
            remaining = self.remaining_steps().len(),
            "Resuming run"
        );
        self.cancel.rearm();
        self.state = EngineState::Running {
            iteration: next.iteration,
            phase: next.phase,
        };
        self.emit(ProgressEvent::RunStarted {
            first_iteration: next.iteration,
            total_phases: self.remaining_steps().len(),
        });
        self.drive(session).await
    }

    async fn drive(&mut self, session: &mut Session) -> Result<RunReport, WorkbenchError> {
        let mut phases_completed = 0;
        let mut validation_warnings = 0;
        let outcome = loop {
            match self.step(session).await? {
                StepOutcome::Recorded(entry) => {
                    phases_completed += 1;
                    if entry.validation.is_failed() {
                        validation_warnings += 1;
                    }
                    if self.state == EngineState::Completed {
                        break RunOutcome::Completed;
                    }
                }
                StepOutcome::Aborted(info) => break RunOutcome::Aborted(info),
                StepOutcome::Cancelled { iteration, phase } => {
                    break RunOutcome::Cancelled { iteration, phase }
                }
            }
        };
        Ok(RunReport {
            outcome,
            phases_completed,
            validation_warnings,
        })
    }

    /// Back to `Idle`; the plan and cursor stay so the phase can be resumed.
    fn cancelled(&mut self, step: PhaseStep) -> StepOutcome {
        tracing::info!(
            iteration = step.iteration,
            phase = step.phase.name(),
            "Phase cancelled"
        );
        self.state = EngineState::Idle;
        self.emit(ProgressEvent::Cancelled {
            iteration: step.iteration,
            phase: step.phase,
        });
        StepOutcome::Cancelled {
            iteration: step.iteration,
            phase: step.phase,
        }
    }
}
