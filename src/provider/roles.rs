// src/provider/roles.rs — Logical model slots (premium / budget)

use super::ReasoningEffort;
use crate::core::types::ModelTier;
use crate::infra::config::ModelsConfig;
use crate::infra::errors::WorkbenchError;

/// A concrete model bound to a slot, with its optional reasoning effort.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotModel {
    pub model: String,
    pub reasoning_effort: Option<ReasoningEffort>,
}

/// Maps the engine's logical tiers to concrete model identifiers.
///
/// Slots may be empty; an empty slot is only an error when a run actually
/// needs it (see [`ModelSlots::resolve`]).
#[derive(Debug, Clone, Default)]
pub struct ModelSlots {
    pub premium: Option<SlotModel>,
    pub budget: Option<SlotModel>,
}

impl ModelSlots {
    /// Both slots served by one model. Handy for tests and offline runs.
    pub fn from_single(model: impl Into<String>) -> Self {
        let slot = SlotModel {
            model: model.into(),
            reasoning_effort: None,
        };
        Self {
            premium: Some(slot.clone()),
            budget: Some(slot),
        }
    }

    pub fn from_config(models: &ModelsConfig) -> Self {
        let slot = |name: &Option<String>, effort: Option<ReasoningEffort>| {
            name.as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| SlotModel {
                    model: n.to_string(),
                    reasoning_effort: effort,
                })
        };
        Self {
            premium: slot(&models.premium, models.premium_reasoning_effort),
            budget: slot(&models.budget, models.budget_reasoning_effort),
        }
    }

    /// Resolve a tier to its model, or a ConfigurationFailure naming the missing key.
    pub fn resolve(&self, tier: ModelTier) -> Result<&SlotModel, WorkbenchError> {
        let (slot, key, env) = match tier {
            ModelTier::Premium => (&self.premium, "models.premium", "PREMIUM_LLM_MODEL"),
            ModelTier::Budget => (&self.budget, "models.budget", "BUDGET_LLM_MODEL"),
        };
        slot.as_ref().ok_or_else(|| WorkbenchError::MissingConfig {
            key: key.into(),
            hint: format!("Set {env} or `{key}` in config.toml"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_single() {
        let slots = ModelSlots::from_single("gpt-5-mini");
        assert_eq!(slots.resolve(ModelTier::Budget).unwrap().model, "gpt-5-mini");
        assert_eq!(slots.resolve(ModelTier::Premium).unwrap().model, "gpt-5-mini");
    }

    #[test]
    fn test_from_config_skips_blank_names() {
        let models = ModelsConfig {
            premium: Some("  ".into()),
            budget: Some("gpt-5-mini".into()),
            budget_reasoning_effort: Some(ReasoningEffort::Low),
            ..Default::default()
        };
        let slots = ModelSlots::from_config(&models);
        assert!(slots.premium.is_none());
        let budget = slots.resolve(ModelTier::Budget).unwrap();
        assert_eq!(budget.model, "gpt-5-mini");
        assert_eq!(budget.reasoning_effort, Some(ReasoningEffort::Low));
    }

    #[test]
    fn test_resolve_missing_names_key() {
        let slots = ModelSlots::default();
        match slots.resolve(ModelTier::Budget) {
            Err(WorkbenchError::MissingConfig { key, hint }) => {
                assert_eq!(key, "models.budget");
                assert!(hint.contains("BUDGET_LLM_MODEL"));
            }
            other => panic!("expected MissingConfig, got {other:?}"),
        }
        let err = slots.resolve(ModelTier::Premium).unwrap_err();
        assert!(err.is_configuration());
    }
}
