// src/cli/edit.rs — Manual draft edits: `workbench edit` and `workbench restore`

use std::io::Read;
use std::path::Path;

use crate::core::history;
use crate::core::types::Session;
use crate::infra::errors::WorkbenchError;
use crate::infra::session::SessionStore;

/// Overwrite the current draft. No history entry is written.
pub fn run_edit(store: &SessionStore, handle: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let mut session = store.load(handle)?;
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    session.current_output = text;
    store.save(handle, &session)?;
    eprintln!(
        "Updated draft of '{handle}' ({} chars)",
        session.current_output.chars().count()
    );
    Ok(())
}

/// Restore history entry `k` (1-based) as the current draft.
pub fn run_restore(store: &SessionStore, handle: &str, k: usize) -> anyhow::Result<()> {
    let mut session = store.load(handle)?;
    restore_entry(&mut session, k)?;
    store.save(handle, &session)?;
    eprintln!("Restored entry {k} of '{handle}' as the current draft");
    Ok(())
}

fn restore_entry(session: &mut Session, k: usize) -> Result<(), WorkbenchError> {
    let index = k.checked_sub(1).ok_or(WorkbenchError::HistoryIndex {
        index: k,
        len: session.history.len(),
    })?;
    history::restore(session, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::Engine;
    use crate::core::formats::OutputFormat;
    use crate::provider::roles::ModelSlots;
    use crate::provider::stub::StubClient;
    use std::sync::Arc;

    #[test]
    fn test_edit_from_file_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions"));
        store
            .save("demo", &Session::new("x", OutputFormat::Text))
            .unwrap();
        let draft = dir.path().join("draft.txt");
        std::fs::write(&draft, "hand-written draft").unwrap();

        run_edit(&store, "demo", Some(draft.as_path())).unwrap();
        let s = store.load("demo").unwrap();
        assert_eq!(s.current_output, "hand-written draft");
        assert!(s.history.is_empty());
    }

    #[tokio::test]
    async fn test_restore_is_one_based() {
        let mut s = Session::new("x", OutputFormat::Text);
        let mut engine = Engine::new(Arc::new(StubClient::new()), ModelSlots::from_single("m"));
        engine.run(&mut s).await.unwrap();
        let first = s.history.get(0).unwrap().output_after.clone();

        restore_entry(&mut s, 1).unwrap();
        assert_eq!(s.current_output, first);
        assert_eq!(s.history.len(), 2);

        assert!(matches!(
            restore_entry(&mut s, 0),
            Err(WorkbenchError::HistoryIndex { .. })
        ));
        assert!(matches!(
            restore_entry(&mut s, 3),
            Err(WorkbenchError::HistoryIndex { index: 2, len: 2 })
        ));
    }
}
