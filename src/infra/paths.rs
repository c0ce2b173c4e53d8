// src/infra/paths.rs — Path management
//
// All paths respect the WORKBENCH_HOME environment variable for isolation.
// When WORKBENCH_HOME is set, config and sessions live under that directory.
// When unset, config uses ~/.workbench/ and sessions use XDG_DATA_HOME/workbench.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the WORKBENCH_HOME override, if set.
fn workbench_home() -> Option<PathBuf> {
    std::env::var_os("WORKBENCH_HOME").map(PathBuf::from)
}

/// Configuration directory: $WORKBENCH_HOME/ or ~/.workbench/
pub fn config_dir() -> PathBuf {
    if let Some(home) = workbench_home() {
        return home;
    }
    dirs_home().join(".workbench")
}

/// Data directory: $WORKBENCH_HOME/data/ or ~/.local/share/workbench/
pub fn data_dir() -> PathBuf {
    if let Some(home) = workbench_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "workbench") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Home directory, falling back to the current directory when it cannot be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default sessions directory
pub fn sessions_dir() -> PathBuf {
    data_dir().join("sessions")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs_home().join(rest),
        None => PathBuf::from(path),
    }
}
