// src/cli/show.rs — `workbench show` and `workbench list`

use crate::core::history::{format_header, unified_diff_labeled};
use crate::core::types::Session;
use crate::infra::errors::WorkbenchError;
use crate::infra::session::SessionStore;
use crate::util::preview;

const PREVIEW_CHARS: usize = 60;

pub fn run_show(
    store: &SessionStore,
    handle: &str,
    entry: Option<usize>,
    diff: bool,
) -> anyhow::Result<()> {
    let session = store.load(handle)?;
    match entry {
        Some(k) => print!("{}", render_entry(&session, k, diff)?),
        None => print!("{}", render_summary(&session)),
    }
    Ok(())
}

pub fn run_list(store: &SessionStore) -> anyhow::Result<()> {
    let handles = store.list()?;
    if handles.is_empty() {
        println!("No sessions in {}", store.root().display());
        return Ok(());
    }
    for handle in handles {
        match store.load(&handle) {
            Ok(s) => println!(
                "{:<24} {:>3} entries  {:<8} {}",
                handle,
                s.history.len(),
                s.format.display_name(),
                preview(s.display_title(), PREVIEW_CHARS)
            ),
            Err(e) => println!("{:<24} (unreadable: {})", handle, e),
        }
    }
    Ok(())
}

/// Session overview: inputs, numbered history headers, current draft.
pub fn render_summary(session: &Session) -> String {
    let mut out = String::new();
    let title = session.display_title();
    out.push_str(&format!("Title:       {}\n", if title.is_empty() { "-" } else { title }));
    out.push_str(&format!("Format:      {}\n", session.format));
    out.push_str(&format!("Iterations:  {}\n", session.iterations_requested));
    out.push_str(&format!(
        "Tiers:       additive={} reductive={}\n",
        session.additive_tier, session.reductive_tier
    ));
    out.push_str(&format!("History:     {} entries", session.history.len()));
    let failures = session.history.validation_failures();
    if failures > 0 {
        out.push_str(&format!(" ({failures} failed validation)"));
    }
    out.push('\n');

    for (i, entry) in session.history.iter().enumerate() {
        out.push_str(&format!("  {:>3}. {}\n", i + 1, format_header(entry)));
    }

    out.push_str("\nCurrent output");
    if session.has_manual_edit() {
        out.push_str(" (edited since last phase)");
    }
    out.push_str(":\n");
    out.push_str(&session.current_output);
    if !session.current_output.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// One history entry in full (1-based `k`), optionally as a diff.
pub fn render_entry(session: &Session, k: usize, diff: bool) -> Result<String, WorkbenchError> {
    let len = session.history.len();
    let entry = k
        .checked_sub(1)
        .and_then(|i| session.history.get(i))
        .ok_or(WorkbenchError::HistoryIndex { index: k, len })?;

    let mut out = format!("{}\n", format_header(entry));
    if let Some(reason) = entry.validation.reason() {
        out.push_str(&format!("Validation failure: {reason}\n"));
    }
    if diff {
        let d = unified_diff_labeled(
            &entry.output_before,
            &entry.output_after,
            "output_before",
            "output_after",
        );
        if d.is_empty() {
            out.push_str("(no changes)\n");
        } else {
            out.push_str(&d);
            out.push('\n');
        }
    } else {
        out.push_str("\n--- prompt ---\n");
        out.push_str(&entry.rendered_prompt);
        out.push_str("\n\n--- output ---\n");
        out.push_str(&entry.output_after);
        out.push('\n');
    }
    Ok(out)
}
