// src/cli/inspect.rs — `workbench validate` and `workbench check`

use crate::core::formats::OutputFormat;
use crate::core::sequence::{plan, tiers_needed};
use crate::core::template::inspect_template;
use crate::core::types::{Phase, Session, Validation};
use crate::core::validator::validate;
use crate::infra::config::Config;
use crate::infra::session::SessionStore;
use crate::provider::roles::ModelSlots;

/// Validate the current draft; fails the command when the draft is invalid.
pub fn run_validate(store: &SessionStore, handle: &str) -> anyhow::Result<()> {
    let session = store.load(handle)?;
    match validate(&session.current_output, session.format) {
        Validation::Failed { reason } => anyhow::bail!("{} validation failed: {reason}", session.format),
        other => {
            println!("{}", validation_line(session.format, &other));
            Ok(())
        }
    }
}

fn validation_line(format: OutputFormat, result: &Validation) -> String {
    if format.is_structural() {
        format!("{format} {result}")
    } else {
        format!("{format} {result} (no structural check for this format)")
    }
}

/// Print template and model configuration findings. Never blocks anything.
pub fn run_check(config: &Config, store: &SessionStore, handle: &str) -> anyhow::Result<()> {
    let session = store.load(handle)?;
    let findings = check_session(&session, &ModelSlots::from_config(&config.models));
    if findings.is_empty() {
        println!("ok");
    } else {
        for f in &findings {
            println!("{f}");
        }
    }
    Ok(())
}

pub fn check_session(session: &Session, slots: &ModelSlots) -> Vec<String> {
    let mut findings = Vec::new();
    for phase in [Phase::Additive, Phase::Reductive] {
        let template = session.template_for(phase);
        if template.trim().is_empty() {
            findings.push(format!("{}: template is empty", phase.name()));
            continue;
        }
        for w in inspect_template(template).warnings() {
            findings.push(format!("{}: {w}", phase.name()));
        }
    }
    let steps = plan(session.iterations_requested.max(1));
    for tier in tiers_needed(session, &steps) {
        if let Err(e) = slots.resolve(tier) {
            findings.push(format!("models: {e}"));
        }
    }
    findings
}
