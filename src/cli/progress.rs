// src/cli/progress.rs — Terminal progress renderer for run feedback

use crate::core::types::ProgressEvent;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the draft.
/// Returns a closure suitable for `Engine::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RunStarted {
            first_iteration,
            total_phases,
        } => format!(
            "[run] {} phase(s) starting at iteration {}",
            total_phases, first_iteration
        ),
        ProgressEvent::PhaseStarted { step, model } => format!(
            "[iter {}] {} (step {}) via {}...",
            step.iteration,
            step.phase.name(),
            step.step_index,
            model
        ),
        ProgressEvent::PhaseCompleted(entry) => format!(
            "[iter {}] {} done: {} -> {} chars, validation={}",
            entry.iteration_index,
            entry.phase.name(),
            entry.output_before.chars().count(),
            entry.output_after.chars().count(),
            entry.validation
        ),
        ProgressEvent::ValidationWarning {
            iteration,
            phase,
            reason,
        } => format!("[warn] iteration {} {}: {}", iteration, phase.name(), reason),
        ProgressEvent::Aborted(info) => format!("[abort] {}", info),
        ProgressEvent::Cancelled { iteration, phase } => format!(
            "[cancel] iteration {} {} cancelled, nothing recorded",
            iteration,
            phase.name()
        ),
        ProgressEvent::Completed { phases } => format!("[done] {} phase(s) completed", phases),
    }
}
