// tests/engine_test.rs — Integration test: iteration engine with scripted clients

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Notify;

use workbench::core::engine::{Engine, StepOutcome};
use workbench::core::formats::OutputFormat;
use workbench::core::types::{
    EngineState, ModelTier, Phase, ProgressEvent, RunOutcome, Session, Validation,
};
use workbench::infra::errors::{FailureKind, WorkbenchError};
use workbench::provider::roles::{ModelSlots, SlotModel};
use workbench::provider::stub::StubClient;
use workbench::provider::{Generation, GenerationClient, GenerationRequest, TokenUsage};

/// Answers "out-{n}" for the n-th call (1-based) and records every prompt.
/// Fails with a server error on the call numbered `fail_on`, if set.
struct ScriptedClient {
    calls: AtomicUsize,
    fail_on: Option<usize>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::new()
        }
    }

    fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, WorkbenchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts
            .lock()
            .unwrap()
            .push((request.model.clone(), request.prompt.clone()));
        if self.fail_on == Some(n) {
            return Err(WorkbenchError::Provider {
                provider: "scripted".into(),
                message: "HTTP 500: upstream exploded".into(),
                retriable: true,
            });
        }
        Ok(Generation {
            text: format!("out-{n}"),
            model_used: request.model,
            usage: TokenUsage::default(),
        })
    }
}

/// Signals `started`, then never answers.
struct HangingClient {
    started: Arc<Notify>,
}

#[async_trait]
impl GenerationClient for HangingClient {
    fn id(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<Generation, WorkbenchError> {
        self.started.notify_one();
        std::future::pending().await
    }
}

/// Returns the same text on every call.
struct FixedClient(&'static str);

#[async_trait]
impl GenerationClient for FixedClient {
    fn id(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, WorkbenchError> {
        Ok(Generation {
            text: self.0.to_string(),
            model_used: request.model,
            usage: TokenUsage::default(),
        })
    }
}

fn session(n: u32) -> Session {
    let mut s = Session::new("Skin Cream Formulation", OutputFormat::Text);
    s.iterations_requested = n;
    s.additive_template = "ADD #{{ITERATION_INDEX}} [{{CURRENT_OUTPUT}}] {{PHASE_RULES}}".into();
    s.reductive_template = "CUT #{{ITERATION_INDEX}} [{{CURRENT_OUTPUT}}] {{PHASE_RULES}}".into();
    s.additive_policy = "grow".into();
    s.reductive_policy = "trim".into();
    s
}

fn slots() -> ModelSlots {
    ModelSlots::from_single("budget-model")
}

// ─── Sequencing ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_skin_cream_single_iteration() {
    let mut s = Session::new("Skin Cream Formulation", OutputFormat::Text);
    let mut engine = Engine::new(Arc::new(StubClient::new()), slots());

    let report = engine.run(&mut s).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.phases_completed, 2);
    assert_eq!(*engine.state(), EngineState::Completed);
    assert_eq!(s.history.len(), 2);

    let first = s.history.get(0).unwrap();
    assert_eq!(first.phase, Phase::Additive);
    assert_eq!(first.iteration_index, 1);
    let second = s.history.get(1).unwrap();
    assert_eq!(second.phase, Phase::Reductive);
    assert_eq!(second.iteration_index, 1);
    assert_eq!(s.current_output, second.output_after);
}

#[tokio::test]
async fn test_n_iterations_alternate_phases() {
    let client = Arc::new(ScriptedClient::new());
    let mut s = session(3);
    let mut engine = Engine::new(client.clone(), slots());

    engine.run(&mut s).await.unwrap();

    let got: Vec<(u32, u32, Phase)> = s
        .history
        .iter()
        .map(|e| (e.iteration_index, e.phase_step_index, e.phase))
        .collect();
    assert_eq!(
        got,
        vec![
            (1, 1, Phase::Additive),
            (1, 2, Phase::Reductive),
            (2, 3, Phase::Additive),
            (2, 4, Phase::Reductive),
            (3, 5, Phase::Additive),
            (3, 6, Phase::Reductive),
        ]
    );
    assert_eq!(s.current_output, "out-6");
    assert_eq!(client.prompts().len(), 6);
}

#[tokio::test]
async fn test_current_output_flows_between_phases() {
    let client = Arc::new(ScriptedClient::new());
    let mut s = session(2);
    s.current_output = "seed".into();
    let mut engine = Engine::new(client.clone(), slots());

    engine.run(&mut s).await.unwrap();

    let prompts: Vec<String> = client.prompts().into_iter().map(|(_, p)| p).collect();
    assert_eq!(
        prompts,
        vec![
            "ADD #1 [seed] grow",
            "CUT #1 [out-1] trim",
            "ADD #2 [out-2] grow",
            "CUT #2 [out-3] trim",
        ]
    );
    for pair in s.history.entries().windows(2) {
        assert_eq!(pair[0].output_after, pair[1].output_before);
    }
    assert_eq!(s.history.get(0).unwrap().output_before, "seed");
}

#[tokio::test]
async fn test_manual_edit_between_steps_is_used() {
    let client = Arc::new(ScriptedClient::new());
    let mut s = session(1);
    let mut engine = Engine::new(client.clone(), slots());

    engine.begin(&s).unwrap();
    assert!(matches!(
        engine.step(&mut s).await.unwrap(),
        StepOutcome::Recorded(_)
    ));

    s.current_output = "hand edited".into();
    assert!(s.has_manual_edit());
    engine.step(&mut s).await.unwrap();

    let last = s.history.last().unwrap();
    assert_eq!(last.output_before, "hand edited");
    assert_eq!(last.rendered_prompt, "CUT #1 [hand edited] trim");
    assert_eq!(*engine.state(), EngineState::Completed);
}

#[tokio::test]
async fn test_follow_up_run_continues_iteration_numbering() {
    let client = Arc::new(ScriptedClient::new());
    let mut s = session(1);
    let mut engine = Engine::new(client.clone(), slots());
    engine.run(&mut s).await.unwrap();

    s.iterations_requested = 2;
    engine.run(&mut s).await.unwrap();

    let iterations: Vec<u32> = s.history.iter().map(|e| e.iteration_index).collect();
    assert_eq!(iterations, vec![1, 1, 2, 2, 3, 3]);
    assert_eq!(s.history.last().unwrap().phase_step_index, 6);
}

#[tokio::test]
async fn test_tiers_route_to_configured_models() {
    let client = Arc::new(ScriptedClient::new());
    let mut s = session(1);
    s.reductive_tier = ModelTier::Premium;
    let slots = ModelSlots {
        premium: Some(SlotModel {
            model: "big".into(),
            reasoning_effort: None,
        }),
        budget: Some(SlotModel {
            model: "small".into(),
            reasoning_effort: None,
        }),
    };
    let mut engine = Engine::new(client.clone(), slots);

    engine.run(&mut s).await.unwrap();

    let models: Vec<String> = client.prompts().into_iter().map(|(m, _)| m).collect();
    assert_eq!(models, vec!["small", "big"]);
    assert_eq!(s.history.get(1).unwrap().tier, ModelTier::Premium);
    assert_eq!(s.history.get(1).unwrap().model_used, "big");
}

// ─── Failures ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transport_failure_aborts_without_recording() {
    let client = Arc::new(ScriptedClient::failing_on(3));
    let mut s = session(3);
    let mut engine = Engine::new(client, slots());

    let report = engine.run(&mut s).await.unwrap();

    assert_eq!(s.history.len(), 2);
    assert_eq!(s.current_output, "out-2");
    match (&report.outcome, engine.state()) {
        (RunOutcome::Aborted(info), EngineState::Aborted(state_info)) => {
            assert_eq!(info, state_info);
            assert_eq!(info.iteration, 2);
            assert_eq!(info.phase, Phase::Additive);
            assert_eq!(info.model, "budget-model");
            assert_eq!(info.rendered_prompt, "ADD #2 [out-2] grow");
            assert_eq!(info.kind, Some(FailureKind::Server));
            assert!(info.message.contains("upstream exploded"));
        }
        other => panic!("expected abort, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resume_after_abort_retries_failed_phase() {
    let client = Arc::new(ScriptedClient::failing_on(3));
    let mut s = session(2);
    let mut engine = Engine::new(client.clone(), slots());
    engine.run(&mut s).await.unwrap();
    assert_eq!(s.history.len(), 2);

    let report = engine.resume(&mut s).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.phases_completed, 2);
    let got: Vec<(u32, Phase)> = s.history.iter().map(|e| (e.iteration_index, e.phase)).collect();
    assert_eq!(
        got,
        vec![
            (1, Phase::Additive),
            (1, Phase::Reductive),
            (2, Phase::Additive),
            (2, Phase::Reductive),
        ]
    );
    // call 3 failed; 4 and 5 completed iteration 2
    assert_eq!(s.current_output, "out-5");
    assert!(matches!(
        engine.resume(&mut s).await,
        Err(WorkbenchError::NothingToResume)
    ));
}

#[tokio::test]
async fn test_missing_budget_model_refuses_to_start() {
    let client = Arc::new(ScriptedClient::new());
    let mut s = session(1);
    let mut engine = Engine::new(client.clone(), ModelSlots::default());

    let err = engine.run(&mut s).await.unwrap_err();

    match err {
        WorkbenchError::MissingConfig { key, .. } => assert_eq!(key, "models.budget"),
        other => panic!("expected MissingConfig, got {other:?}"),
    }
    assert_eq!(*engine.state(), EngineState::Idle);
    assert!(s.history.is_empty());
    assert!(client.prompts().is_empty());
}

#[tokio::test]
async fn test_zero_iterations_rejected() {
    let mut s = session(0);
    let mut engine = Engine::new(Arc::new(ScriptedClient::new()), slots());
    assert!(matches!(
        engine.run(&mut s).await,
        Err(WorkbenchError::InvalidIterations(0))
    ));
    assert_eq!(*engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_invalid_json_is_recorded_and_run_continues() {
    let mut s = session(2);
    s.format = OutputFormat::Json;
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let mut engine = Engine::new(Arc::new(FixedClient("{\"a\": ")), slots())
        .with_progress(move |e| sink.lock().unwrap().push(e));

    let report = engine.run(&mut s).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.validation_warnings, 4);
    assert_eq!(s.history.len(), 4);
    assert!(s.history.iter().all(|e| e.validation.is_failed()));
    assert!(matches!(
        &s.history.get(0).unwrap().validation,
        Validation::Failed { reason } if reason.starts_with("Invalid JSON")
    ));
    let warnings = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, ProgressEvent::ValidationWarning { .. }))
        .count();
    assert_eq!(warnings, 4);
}

// ─── Cancellation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_during_first_phase_records_nothing() {
    let started = Arc::new(Notify::new());
    let client = Arc::new(HangingClient {
        started: started.clone(),
    });
    let mut s = session(2);
    s.current_output = "untouched".into();
    let mut engine = Engine::new(client, slots());
    let cancel = engine.cancel_handle();

    let (report, ()) = tokio::join!(engine.run(&mut s), async {
        started.notified().await;
        cancel.cancel();
    });

    let report = report.unwrap();
    assert_eq!(
        report.outcome,
        RunOutcome::Cancelled {
            iteration: 1,
            phase: Phase::Additive
        }
    );
    assert_eq!(report.phases_completed, 0);
    assert!(s.history.is_empty());
    assert_eq!(s.current_output, "untouched");
    assert_eq!(*engine.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_new_run_after_cancel_is_not_pre_cancelled() {
    let mut s = session(1);
    let mut engine = Engine::new(Arc::new(ScriptedClient::new()), slots());
    engine.cancel_handle().cancel();

    let report = engine.run(&mut s).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(s.history.len(), 2);
}
