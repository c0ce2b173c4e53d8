// src/core/formats.rs — Declared output formats

use serde::{Deserialize, Serialize};

/// The shape a session's artifact is expected to take.
///
/// Only `Json` carries a structural check; the others are soft formats that
/// shape the prompt but are never enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Json,
    Markdown,
    Code,
    #[default]
    Text,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Json,
        OutputFormat::Markdown,
        OutputFormat::Code,
        OutputFormat::Text,
    ];

    /// Human-facing name, as substituted for the `FORMAT` token.
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Markdown => "Markdown",
            OutputFormat::Code => "Code",
            OutputFormat::Text => "Text",
        }
    }

    /// Short instruction block substituted for the `FORMAT_GUIDANCE` token.
    pub fn guidance(&self) -> &'static str {
        match self {
            OutputFormat::Json => {
                "Output format guidance: respond with valid JSON and nothing else.\n\
                 No markdown fences, no commentary before or after the document.\n\
                 Quote every key and every string value."
            }
            OutputFormat::Markdown => {
                "Output format guidance: respond in Markdown.\n\
                 Prefer short headings and bullet lists.\n\
                 Only use code fences when code is actually requested."
            }
            OutputFormat::Code => {
                "Output format guidance: respond with runnable source code.\n\
                 Put any explanation in code comments rather than surrounding prose.\n\
                 Include the imports the code needs."
            }
            OutputFormat::Text => {
                "Output format guidance: respond in plain text.\n\
                 Use short paragraphs or numbered lines for structure.\n\
                 Avoid markdown syntax unless asked for it."
            }
        }
    }

    /// Whether outputs in this format get a structural check.
    pub fn is_structural(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "code" | "python" => Ok(OutputFormat::Code),
            "text" | "txt" | "plain" => Ok(OutputFormat::Text),
            other => Err(format!(
                "unknown format '{other}' (expected json, markdown, code or text)"
            )),
        }
    }
}
