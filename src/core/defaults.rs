// src/core/defaults.rs — Baseline phase rules and prompt templates for new sessions

pub const ADDITIVE_POLICY: &str = "Add missing detail, steps, quantities and edge cases. \
Extend the existing structure; do not discard content that is still correct.";

pub const REDUCTIVE_POLICY: &str = "Remove redundancy, filler and speculative additions. \
Merge overlapping sections and tighten wording without losing required content.";

pub const ADDITIVE_TEMPLATE: &str = "\
Phase: {{PHASE_NAME}} (iteration {{ITERATION_INDEX}})
Target format: {{FORMAT}}

Outcome:
{{OUTCOME}}

Requirements and constraints:
{{REQUIREMENTS}}

Special resources:
{{SPECIAL_RESOURCES}}

What this phase may change:
{{PHASE_RULES}}

{{FORMAT_GUIDANCE}}

Current draft:
{{CURRENT_OUTPUT}}

Expand and improve the draft. Keep whatever prior structure is still valid.
Return only the revised draft.";

pub const REDUCTIVE_TEMPLATE: &str = "\
Phase: {{PHASE_NAME}} (iteration {{ITERATION_INDEX}})
Target format: {{FORMAT}}

Outcome:
{{OUTCOME}}

Requirements and constraints:
{{REQUIREMENTS}}

Special resources:
{{SPECIAL_RESOURCES}}

What this phase may change:
{{PHASE_RULES}}

{{FORMAT_GUIDANCE}}

Current draft:
{{CURRENT_OUTPUT}}

Simplify and tighten the draft while keeping it correct and complete.
Return only the revised draft.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::template::inspect_template;

    #[test]
    fn test_baseline_templates_are_clean() {
        for t in [ADDITIVE_TEMPLATE, REDUCTIVE_TEMPLATE] {
            let report = inspect_template(t);
            assert!(report.is_clean(), "{report:?}");
        }
    }
}
