// src/core/template.rs — Prompt template rendering
//
// Placeholders are `{{NAME}}` with optional whitespace inside the braces,
// where NAME is made of `A-Z`, `0-9` and `_`. Only names in the fixed
// `Token` set are substituted; anything else is copied through verbatim.

use std::collections::{BTreeMap, BTreeSet};

use super::formats::OutputFormat;
use super::types::{Phase, Session};

/// Tokens every phase template is expected to reference.
pub const REQUIRED_TOKENS: [Token; 2] = [Token::CurrentOutput, Token::PhaseRules];

const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    Outcome,
    Requirements,
    SpecialResources,
    Format,
    FormatGuidance,
    PhaseRules,
    CurrentOutput,
    IterationIndex,
    PhaseName,
}

impl Token {
    pub const ALL: [Token; 9] = [
        Token::Outcome,
        Token::Requirements,
        Token::SpecialResources,
        Token::Format,
        Token::FormatGuidance,
        Token::PhaseRules,
        Token::CurrentOutput,
        Token::IterationIndex,
        Token::PhaseName,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Token::Outcome => "OUTCOME",
            Token::Requirements => "REQUIREMENTS",
            Token::SpecialResources => "SPECIAL_RESOURCES",
            Token::Format => "FORMAT",
            Token::FormatGuidance => "FORMAT_GUIDANCE",
            Token::PhaseRules => "PHASE_RULES",
            Token::CurrentOutput => "CURRENT_OUTPUT",
            Token::IterationIndex => "ITERATION_INDEX",
            Token::PhaseName => "PHASE_NAME",
        }
    }

    /// Exact-name lookup. Case matters: `{{outcome}}` is not a token.
    pub fn from_name(name: &str) -> Option<Token> {
        Token::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn placeholder(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Token values for one phase. Built fresh per phase, never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    values: BTreeMap<Token, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every token from the session as it stands right now.
    pub fn for_phase(session: &Session, iteration: u32, phase: Phase) -> Self {
        let mut ctx = Self::new();
        ctx.set(Token::Outcome, &session.outcome);
        ctx.set(Token::Requirements, &session.requirements);
        ctx.set(Token::SpecialResources, &session.special_resources);
        ctx.set(Token::Format, session.format.display_name());
        ctx.set(Token::FormatGuidance, session.format.guidance());
        ctx.set(Token::PhaseRules, session.policy_for(phase));
        ctx.set(Token::CurrentOutput, &session.current_output);
        ctx.set(Token::IterationIndex, iteration.to_string());
        ctx.set(Token::PhaseName, phase.name());
        ctx
    }

    pub fn set(&mut self, token: Token, value: impl Into<String>) {
        self.values.insert(token, value.into());
    }

    /// Unbound tokens render as empty strings.
    pub fn get(&self, token: Token) -> &str {
        self.values.get(&token).map(String::as_str).unwrap_or("")
    }
}

/// Match a placeholder starting exactly at byte `start`.
/// Returns the byte offset just past the closing braces and the inner name.
fn placeholder_at(s: &str, start: usize) -> Option<(usize, &str)> {
    let inner = s[start..].strip_prefix("{{")?.trim_start();
    let name_len = inner
        .bytes()
        .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || *b == b'_')
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &inner[..name_len];
    let rest = inner[name_len..].trim_start().strip_prefix("}}")?;
    Some((s.len() - rest.len(), name))
}

/// Walk every placeholder left to right: `(start, end, name)`.
fn placeholders<'a>(s: &'a str) -> impl Iterator<Item = (usize, usize, &'a str)> + 'a {
    let mut search = 0;
    std::iter::from_fn(move || {
        while let Some(rel) = s.get(search..)?.find("{{") {
            let start = search + rel;
            match placeholder_at(s, start) {
                Some((end, name)) => {
                    search = end;
                    return Some((start, end, name));
                }
                None => search = start + 1,
            }
        }
        None
    })
}

/// Substitute recognized tokens. Deterministic and side-effect free.
pub fn render(template: &str, ctx: &PromptContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    for (start, end, name) in placeholders(template) {
        out.push_str(&template[cursor..start]);
        match Token::from_name(name) {
            Some(token) => out.push_str(ctx.get(token)),
            None => out.push_str(&template[start..end]),
        }
        cursor = end;
    }
    out.push_str(&template[cursor..]);
    out
}

/// Render a phase template, optionally prefixing the format guidance block
/// when the template gives the model no format hint of its own.
pub fn render_phase(
    template: &str,
    ctx: &PromptContext,
    format: OutputFormat,
    prepend_guidance: bool,
) -> String {
    let rendered = render(template, ctx);
    if prepend_guidance && !mentions_format(template, format) {
        format!("{}\n\n{}", format.guidance(), rendered)
    } else {
        rendered
    }
}

fn mentions_format(template: &str, format: OutputFormat) -> bool {
    let names = find_tokens(template);
    names.contains(Token::Format.name())
        || names.contains(Token::FormatGuidance.name())
        || template
            .to_lowercase()
            .contains(&format.display_name().to_lowercase())
}

/// Distinct placeholder names present in the template, recognized or not.
pub fn find_tokens(template: &str) -> BTreeSet<String> {
    placeholders(template)
        .map(|(_, _, name)| name.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToken {
    pub name: String,
    pub suggestion: Option<Token>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateReport {
    pub unknown: Vec<UnknownToken>,
    pub missing_required: Vec<Token>,
}

impl TemplateReport {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty() && self.missing_required.is_empty()
    }

    /// One human-readable line per finding.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for u in &self.unknown {
            match u.suggestion {
                Some(s) => out.push(format!(
                    "unknown token {{{{{}}}}} (did you mean {}?)",
                    u.name,
                    s.placeholder()
                )),
                None => out.push(format!("unknown token {{{{{}}}}} is left as-is", u.name)),
            }
        }
        for t in &self.missing_required {
            out.push(format!("missing required token {}", t.placeholder()));
        }
        out
    }
}

/// Report unknown placeholder names and missing required tokens.
pub fn inspect_template(template: &str) -> TemplateReport {
    let found = find_tokens(template);
    let unknown = found
        .iter()
        .filter(|name| Token::from_name(name).is_none())
        .map(|name| UnknownToken {
            name: name.clone(),
            suggestion: closest_token(name),
        })
        .collect();
    let missing_required = REQUIRED_TOKENS
        .into_iter()
        .filter(|t| !found.contains(t.name()))
        .collect();
    TemplateReport {
        unknown,
        missing_required,
    }
}

fn closest_token(name: &str) -> Option<Token> {
    Token::ALL
        .into_iter()
        .map(|t| (t, strsim::jaro_winkler(name, t.name())))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(t, _)| t)
}
