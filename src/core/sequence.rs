// src/core/sequence.rs — Phase sequence planning and model tier selection

use super::types::{ModelTier, Phase, PhaseStep, Session};

/// Phases of one iteration, in execution order.
pub const PHASE_ORDER: [Phase; 2] = [Phase::Additive, Phase::Reductive];

/// The `2N` steps of an `N`-iteration run starting at iteration 1.
pub fn plan(iterations: u32) -> Vec<PhaseStep> {
    plan_from(1, iterations)
}

/// The `2N` steps of an `N`-iteration run whose first iteration is `first`.
///
/// Iteration indices run `first..first+N`; each contributes an additive then
/// a reductive step. `iterations == 0` yields an empty plan.
pub fn plan_from(first: u32, iterations: u32) -> Vec<PhaseStep> {
    (first..first.saturating_add(iterations))
        .flat_map(|iteration| {
            PHASE_ORDER.into_iter().map(move |phase| PhaseStep {
                iteration,
                phase,
                step_index: step_index(iteration, phase),
            })
        })
        .collect()
}

/// 1-based position of `(iteration, phase)` in the overall sequence.
pub fn step_index(iteration: u32, phase: Phase) -> u32 {
    let base = iteration.saturating_sub(1).saturating_mul(2);
    match phase {
        Phase::Additive => base + 1,
        Phase::Reductive => base + 2,
    }
}

/// Which model slot a step runs on. Depends only on phase metadata.
pub fn tier_for(session: &Session, step: &PhaseStep) -> ModelTier {
    session.tier_for(step.phase)
}

/// Distinct tiers a plan needs, in first-use order.
pub fn tiers_needed(session: &Session, steps: &[PhaseStep]) -> Vec<ModelTier> {
    let mut tiers = Vec::new();
    for step in steps {
        let tier = tier_for(session, step);
        if !tiers.contains(&tier) {
            tiers.push(tier);
        }
    }
    tiers
}
