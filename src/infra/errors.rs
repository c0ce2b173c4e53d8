// src/infra/errors.rs — Error types for the workbench

use thiserror::Error;

/// Coarse classification of a generation failure, carried alongside the
/// provider message so callers can tell a dead network from a revoked key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Auth,
    RateLimit,
    Timeout,
    Server,
    InvalidResponse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Network => "network",
            FailureKind::Auth => "auth",
            FailureKind::RateLimit => "rate_limit",
            FailureKind::Timeout => "timeout",
            FailureKind::Server => "server",
            FailureKind::InvalidResponse => "invalid_response",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum WorkbenchError {
    // Transport errors (generation client)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Provider '{provider}' timed out")]
    Timeout { provider: String },

    #[error("Provider '{provider}' rejected credentials: {message}")]
    Auth { provider: String, message: String },

    // Persistence errors
    #[error("Session '{handle}' not found")]
    SessionNotFound { handle: String },

    #[error("Session at {location} is invalid: {reason}")]
    CorruptSession { location: String, reason: String },

    #[error("Unsupported schema_version={version}; supported versions: 1")]
    UnsupportedSchema { version: u32 },

    #[error("Invalid session handle '{handle}' (use letters, digits, '.', '_' or '-')")]
    InvalidHandle { handle: String },

    // Configuration errors
    #[error("Missing configuration value '{key}'. {hint}")]
    MissingConfig { key: String, hint: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Engine guards
    #[error("A run is already in progress for this session")]
    RunInProgress,

    #[error("No interrupted run to resume")]
    NothingToResume,

    #[error("No run in progress; begin a run before stepping")]
    NotRunning,

    #[error("Iterations must be >= 1 (got {0})")]
    InvalidIterations(u32),

    #[error("History entry {index} is out of range (history has {len} entries)")]
    HistoryIndex { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkbenchError {
    /// True for failures of the generation transport.
    pub fn is_transport(&self) -> bool {
        self.failure_kind().is_some()
    }

    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            WorkbenchError::Provider {
                retriable: true,
                ..
            } | WorkbenchError::RateLimited { .. }
                | WorkbenchError::Timeout { .. }
        )
    }

    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            WorkbenchError::SessionNotFound { .. }
                | WorkbenchError::CorruptSession { .. }
                | WorkbenchError::UnsupportedSchema { .. }
                | WorkbenchError::InvalidHandle { .. }
                | WorkbenchError::Io(_)
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WorkbenchError::MissingConfig { .. } | WorkbenchError::Config(_)
        )
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            WorkbenchError::Provider { retriable, message, .. } => {
                if message.starts_with("Failed to parse") {
                    Some(FailureKind::InvalidResponse)
                } else if *retriable {
                    Some(FailureKind::Server)
                } else {
                    Some(FailureKind::Network)
                }
            }
            WorkbenchError::RateLimited { .. } => Some(FailureKind::RateLimit),
            WorkbenchError::Timeout { .. } => Some(FailureKind::Timeout),
            WorkbenchError::Auth { .. } => Some(FailureKind::Auth),
            _ => None,
        }
    }
}
