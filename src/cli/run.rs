// src/cli/run.rs — `workbench run`: drive a session's iterations

use std::sync::Arc;
use std::time::Duration;

use crate::core::engine::{Engine, EngineSettings, StepOutcome};
use crate::core::types::{EngineState, Session};
use crate::infra::config::Config;
use crate::infra::errors::WorkbenchError;
use crate::infra::session::SessionStore;
use crate::provider::openai::OpenAiClient;
use crate::provider::retry::{RetryClient, RetryConfig};
use crate::provider::roles::{ModelSlots, SlotModel};
use crate::provider::stub::StubClient;
use crate::provider::GenerationClient;

use super::progress::terminal_progress;

const OFFLINE_MODEL: &str = "offline";

pub struct RunOptions {
    pub iterations: Option<u32>,
    pub offline: bool,
    pub quiet: bool,
}

/// Run a stored session, saving after every completed phase.
///
/// Ctrl-C cancels the in-flight phase; everything recorded before it stays saved.
pub async fn run_session(
    config: &Config,
    store: &SessionStore,
    handle: &str,
    opts: RunOptions,
) -> anyhow::Result<()> {
    let mut session = store.load(handle)?;
    let stored_iterations = session.iterations_requested;
    if let Some(n) = opts.iterations {
        session.iterations_requested = n;
    }

    let (client, slots) = if opts.offline {
        (
            Arc::new(StubClient::new()) as Arc<dyn GenerationClient>,
            offline_slots(config),
        )
    } else {
        (build_client(config)?, ModelSlots::from_config(&config.models))
    };

    let mut engine = Engine::new(client, slots).with_settings(EngineSettings::from_config(config));
    if !opts.quiet {
        engine = engine.with_progress(terminal_progress());
    }

    engine.begin(&session)?;
    // The plan is fixed by `begin`; an override never reaches the stored session.
    session.iterations_requested = stored_iterations;

    let cancel = engine.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = drive(&mut engine, &mut session, store, handle).await;
    ctrl_c.abort();
    result?;

    match engine.state() {
        EngineState::Completed => {
            println!("{}", session.current_output);
            Ok(())
        }
        EngineState::Aborted(info) => anyhow::bail!(
            "{info}\nCompleted phases are saved in '{handle}'; run it again to continue."
        ),
        _ => {
            eprintln!("Cancelled. Completed phases are saved in '{handle}'.");
            Ok(())
        }
    }
}

async fn drive(
    engine: &mut Engine,
    session: &mut Session,
    store: &SessionStore,
    handle: &str,
) -> anyhow::Result<()> {
    loop {
        match engine.step(session).await? {
            StepOutcome::Recorded(_) => {
                store.save(handle, session)?;
                if !engine.state().is_running() {
                    return Ok(());
                }
            }
            StepOutcome::Aborted(_) | StepOutcome::Cancelled { .. } => return Ok(()),
        }
    }
}

/// OpenAI-compatible client wrapped in transport retry.
pub fn build_client(config: &Config) -> Result<Arc<dyn GenerationClient>, WorkbenchError> {
    let api_key = config
        .models
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| WorkbenchError::MissingConfig {
            key: "models.api_key".into(),
            hint: "Set OPENAI_API_KEY or `api_key` under [models] in config.toml".into(),
        })?;

    let mut client = OpenAiClient::new(
        api_key,
        config.models.base_url.clone(),
        Duration::from_secs(config.generation.timeout_seconds),
    )?;
    if config.logging.verbose_llm {
        client = client.with_verbose_logging(config.logging.verbose_llm_max_chars);
    }

    Ok(Arc::new(RetryClient::with_config(
        Arc::new(client),
        RetryConfig::from(&config.retry),
    )))
}

/// Configured slots, with any empty slot filled by a placeholder name.
fn offline_slots(config: &Config) -> ModelSlots {
    let mut slots = ModelSlots::from_config(&config.models);
    let placeholder = || SlotModel {
        model: OFFLINE_MODEL.into(),
        reasoning_effort: None,
    };
    slots.premium.get_or_insert_with(placeholder);
    slots.budget.get_or_insert_with(placeholder);
    slots
}
