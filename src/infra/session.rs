// src/infra/session.rs — Session store
//
// One pretty-printed JSON document per session at `<root>/<handle>.json`.
// Writes go through a temp file in the same directory followed by a rename,
// so a concurrent reader sees either the old document or the new one.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::types::{Session, SCHEMA_VERSION};
use crate::infra::errors::WorkbenchError;

const EXTENSION: &str = "json";
const MAX_HANDLE_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, handle: &str) -> Result<PathBuf, WorkbenchError> {
        validate_handle(handle)?;
        Ok(self.root.join(format!("{handle}.{EXTENSION}")))
    }

    pub fn exists(&self, handle: &str) -> bool {
        self.path_for(handle).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Persist the whole session under `handle`, replacing any previous version.
    pub fn save(&self, handle: &str, session: &Session) -> Result<String, WorkbenchError> {
        let path = self.path_for(handle)?;
        save_to_path(&path, session)?;
        tracing::debug!(handle, entries = session.history.len(), "Session saved");
        Ok(handle.to_string())
    }

    pub fn load(&self, handle: &str) -> Result<Session, WorkbenchError> {
        let path = self.path_for(handle)?;
        match load_from_path(&path) {
            Err(WorkbenchError::SessionNotFound { .. }) => Err(WorkbenchError::SessionNotFound {
                handle: handle.to_string(),
            }),
            other => other,
        }
    }

    /// Known handles, sorted.
    pub fn list(&self) -> Result<Vec<String>, WorkbenchError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let pattern = format!(
            "{}/*.{EXTENSION}",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        let paths = glob::glob(&pattern)
            .map_err(|e| WorkbenchError::Config(format!("Bad sessions path: {e}")))?;

        let mut handles: Vec<String> = paths
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|h| validate_handle(h).is_ok())
            .collect();
        handles.sort();
        Ok(handles)
    }
}

/// Write a session document atomically to an arbitrary location.
pub fn save_to_path(path: &Path, session: &Session) -> Result<(), WorkbenchError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let json = serde_json::to_string_pretty(session)
        .map_err(|e| WorkbenchError::Other(anyhow::anyhow!("Failed to encode session: {e}")))?;

    write_atomic(&dir, path, |f| f.write_all(json.as_bytes()))?;
    Ok(())
}

/// Temp file in `dir`, filled by `fill`, fsynced, then renamed over `path`.
/// On any failure the temp file is removed and `path` is left as it was.
fn write_atomic<F>(dir: &Path, path: &Path, fill: F) -> std::io::Result<()>
where
    F: FnOnce(&mut std::fs::File) -> std::io::Result<()>,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".into());
    let tmp = dir.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

    let written = (|| -> std::io::Result<()> {
        let mut f = std::fs::File::create(&tmp)?;
        fill(&mut f)?;
        f.flush()?;
        f.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written
}

/// Read and check a session document from an arbitrary location.
pub fn load_from_path(path: &Path) -> Result<Session, WorkbenchError> {
    let location = path.display().to_string();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WorkbenchError::SessionNotFound { handle: location });
        }
        Err(e) => return Err(e.into()),
    };

    let corrupt = |reason: String| WorkbenchError::CorruptSession {
        location: location.clone(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| corrupt(format!("not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(corrupt("top-level value is not an object".into()));
    }
    if let Some(version) = value.get("schemaVersion").and_then(|v| v.as_u64()) {
        if version != u64::from(SCHEMA_VERSION) {
            return Err(WorkbenchError::UnsupportedSchema {
                version: u32::try_from(version).unwrap_or(u32::MAX),
            });
        }
    }

    let session: Session = serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
    if session.iterations_requested < 1 {
        return Err(corrupt("iterationsRequested must be >= 1".into()));
    }
    Ok(session)
}

/// Handles are file stems: `[A-Za-z0-9._-]`, not starting with a dot.
pub fn validate_handle(handle: &str) -> Result<(), WorkbenchError> {
    let ok = !handle.is_empty()
        && handle.len() <= MAX_HANDLE_LEN
        && !handle.starts_with('.')
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(WorkbenchError::InvalidHandle {
            handle: handle.to_string(),
        })
    }
}

/// Derive a handle from a display title.
pub fn handle_from_title(title: &str) -> String {
    let mut handle = slug::slugify(title);
    handle.truncate(MAX_HANDLE_LEN);
    if handle.is_empty() {
        "session".into()
    } else {
        handle
    }
}
