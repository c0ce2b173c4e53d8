// src/core/history.rs — Append-only history log and display helpers

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use super::types::{HistoryEntry, Phase, Session};
use crate::infra::errors::WorkbenchError;

const DIFF_CONTEXT: usize = 3;
/// Upper bound on the LCS table. A larger changed region is shown as one
/// delete block followed by one insert block.
const MAX_LCS_CELLS: usize = 4_000_000;

/// Ordered record of executed phases. Insertion order is temporal order.
///
/// Only the engine appends; everything else gets read access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub(crate) fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Lookup by iteration and phase. The most recent match wins when a
    /// resumed run has repeated an iteration index.
    pub fn find(&self, iteration: u32, phase: Phase) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.iteration_index == iteration && e.phase == phase)
    }

    /// Highest iteration index recorded, 0 when empty.
    pub fn max_iteration(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| e.iteration_index)
            .max()
            .unwrap_or(0)
    }

    pub fn validation_failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.validation.is_failed())
            .count()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Put entry `index`'s output back as the working draft.
///
/// This counts as a manual edit: no history entry is written.
pub fn restore(session: &mut Session, index: usize) -> Result<(), WorkbenchError> {
    let entry = session
        .history
        .get(index)
        .ok_or(WorkbenchError::HistoryIndex {
            index,
            len: session.history.len(),
        })?;
    session.current_output = entry.output_after.clone();
    Ok(())
}

/// Compact one-line header for history listings.
pub fn format_header(entry: &HistoryEntry) -> String {
    let model = entry.model_used.trim();
    format!(
        "phase={} | iteration={} | step={} | ts={} | model={} | validation={}",
        entry.phase,
        entry.iteration_index,
        entry.phase_step_index,
        entry
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        if model.is_empty() { "-" } else { model },
        entry.validation,
    )
}

/// Line-level unified diff. Empty when the inputs are equal.
pub fn unified_diff(before: &str, after: &str) -> String {
    unified_diff_labeled(before, after, "before", "after")
}

pub fn unified_diff_labeled(before: &str, after: &str, from: &str, to: &str) -> String {
    if before == after {
        return String::new();
    }
    let a: Vec<&str> = before.lines().collect();
    let b: Vec<&str> = after.lines().collect();
    let ops = diff_ops(&a, &b);
    if ops.iter().all(|op| op.kind == OpKind::Equal) {
        return String::new();
    }

    let mut out = vec![format!("--- {from}"), format!("+++ {to}")];
    for (lo, hi) in hunk_ranges(&ops) {
        let hunk = &ops[lo..hi];
        let a_len = hunk.iter().filter(|o| o.kind != OpKind::Insert).count();
        let b_len = hunk.iter().filter(|o| o.kind != OpKind::Delete).count();
        out.push(format!(
            "@@ -{} +{} @@",
            hunk_range(hunk[0].a_pos, a_len),
            hunk_range(hunk[0].b_pos, b_len)
        ));
        for op in hunk {
            match op.kind {
                OpKind::Equal => out.push(format!(" {}", a[op.a_pos])),
                OpKind::Delete => out.push(format!("-{}", a[op.a_pos])),
                OpKind::Insert => out.push(format!("+{}", b[op.b_pos])),
            }
        }
    }
    out.join("\n")
}

fn hunk_range(pos: usize, len: usize) -> String {
    match len {
        0 => format!("{pos},0"),
        1 => format!("{}", pos + 1),
        _ => format!("{},{}", pos + 1, len),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Equal,
    Delete,
    Insert,
}

/// One diff operation; `a_pos` / `b_pos` are the line indices the op sits at.
#[derive(Debug, Clone, Copy)]
struct DiffOp {
    kind: OpKind,
    a_pos: usize,
    b_pos: usize,
}

/// Common prefix and suffix are matched directly; only the changed middle
/// goes through the LCS table.
fn diff_ops(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let equal = |a_pos, b_pos| DiffOp {
        kind: OpKind::Equal,
        a_pos,
        b_pos,
    };
    let mut ops = Vec::with_capacity(a.len() + b.len());
    ops.extend((0..prefix).map(|k| equal(k, k)));

    if (a_mid.len() + 1).saturating_mul(b_mid.len() + 1) > MAX_LCS_CELLS {
        ops.extend((0..a_mid.len()).map(|k| DiffOp {
            kind: OpKind::Delete,
            a_pos: prefix + k,
            b_pos: prefix,
        }));
        ops.extend((0..b_mid.len()).map(|k| DiffOp {
            kind: OpKind::Insert,
            a_pos: prefix + a_mid.len(),
            b_pos: prefix + k,
        }));
    } else {
        ops.extend(lcs_ops(a_mid, b_mid).into_iter().map(|op| DiffOp {
            a_pos: op.a_pos + prefix,
            b_pos: op.b_pos + prefix,
            ..op
        }));
    }

    let (a_tail, b_tail) = (a.len() - suffix, b.len() - suffix);
    ops.extend((0..suffix).map(|k| equal(a_tail + k, b_tail + k)));
    ops
}

/// LCS backtrack over lines.
fn lcs_ops(a: &[&str], b: &[&str]) -> Vec<DiffOp> {
    let (n, m) = (a.len(), b.len());
    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        // Deletions come before insertions within a change block.
        let kind = if i < n && j < m && a[i] == b[j] {
            OpKind::Equal
        } else if i < n && (j == m || lcs[i + 1][j] >= lcs[i][j + 1]) {
            OpKind::Delete
        } else {
            OpKind::Insert
        };
        ops.push(DiffOp {
            kind,
            a_pos: i,
            b_pos: j,
        });
        match kind {
            OpKind::Equal => {
                i += 1;
                j += 1;
            }
            OpKind::Delete => i += 1,
            OpKind::Insert => j += 1,
        }
    }
    ops
}

/// Op index ranges `[lo, hi)` for each hunk, with context merged.
fn hunk_ranges(ops: &[DiffOp]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        if op.kind == OpKind::Equal {
            continue;
        }
        let lo = idx.saturating_sub(DIFF_CONTEXT);
        let hi = (idx + 1 + DIFF_CONTEXT).min(ops.len());
        match ranges.last_mut() {
            Some(last) if lo <= last.1 => last.1 = hi,
            _ => ranges.push((lo, hi)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::formats::OutputFormat;
    use crate::core::types::{ModelTier, Validation};
    use chrono::{TimeZone, Utc};

    fn entry(iteration: u32, phase: Phase, after: &str) -> HistoryEntry {
        let step = (iteration - 1) * 2 + if phase == Phase::Additive { 1 } else { 2 };
        HistoryEntry {
            iteration_index: iteration,
            phase_step_index: step,
            phase,
            tier: ModelTier::Budget,
            model_used: "gpt-5-mini".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap(),
            rendered_prompt: "prompt".into(),
            output_before: String::new(),
            output_after: after.into(),
            validation: Validation::Passed,
        }
    }

    // ─── History ────────────────────────────────────────────────

    #[test]
    fn test_append_preserves_order() {
        let mut h = History::default();
        h.append(entry(1, Phase::Additive, "a"));
        h.append(entry(1, Phase::Reductive, "b"));
        h.append(entry(2, Phase::Additive, "c"));
        let outs: Vec<_> = h.iter().map(|e| e.output_after.as_str()).collect();
        assert_eq!(outs, vec!["a", "b", "c"]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.max_iteration(), 2);
        assert_eq!(h.last().unwrap().output_after, "c");
    }

    #[test]
    fn test_find_by_iteration_and_phase() {
        let mut h = History::default();
        h.append(entry(1, Phase::Additive, "a"));
        h.append(entry(1, Phase::Reductive, "b"));
        assert_eq!(h.find(1, Phase::Reductive).unwrap().output_after, "b");
        assert!(h.find(2, Phase::Additive).is_none());
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let mut h = History::default();
        h.append(entry(1, Phase::Additive, "a"));
        let v = serde_json::to_value(&h).unwrap();
        assert!(v.is_array());
        assert_eq!(v[0]["phase"], "ADDITIVE");
        assert_eq!(v[0]["phaseStepIndex"], 1);
    }

    // ─── Restore ────────────────────────────────────────────────

    #[test]
    fn test_restore_sets_output_without_new_entry() {
        let mut s = Session::new("x", OutputFormat::Text);
        s.history.append(entry(1, Phase::Additive, "long draft"));
        s.history.append(entry(1, Phase::Reductive, "short draft"));
        s.current_output = "short draft".into();

        restore(&mut s, 0).unwrap();
        assert_eq!(s.current_output, "long draft");
        assert_eq!(s.history.len(), 2);
        assert!(s.has_manual_edit());
    }

    #[test]
    fn test_restore_out_of_range() {
        let mut s = Session::new("x", OutputFormat::Text);
        s.current_output = "keep".into();
        match restore(&mut s, 0) {
            Err(WorkbenchError::HistoryIndex { index, len }) => {
                assert_eq!((index, len), (0, 0));
            }
            other => panic!("expected HistoryIndex, got {other:?}"),
        }
        assert_eq!(s.current_output, "keep");
    }

    // ─── Display ────────────────────────────────────────────────

    #[test]
    fn test_format_header() {
        let mut e = entry(2, Phase::Reductive, "x");
        assert_eq!(
            format_header(&e),
            "phase=REDUCTIVE | iteration=2 | step=4 | ts=2026-03-01T12:30:05Z | model=gpt-5-mini | validation=PASSED"
        );
        e.model_used = "  ".into();
        e.validation = Validation::Failed {
            reason: "bad".into(),
        };
        assert!(format_header(&e).ends_with("model=- | validation=FAILED(bad)"));
    }

    #[test]
    fn test_diff_equal_is_empty() {
        assert_eq!(unified_diff("a\nb", "a\nb"), "");
        assert_eq!(unified_diff("", ""), "");
    }

    #[test]
    fn test_diff_single_change() {
        let d = unified_diff("one\ntwo\nthree", "one\n2\nthree");
        assert_eq!(
            d,
            "--- before\n+++ after\n@@ -1,3 +1,3 @@\n one\n-two\n+2\n three"
        );
    }

    #[test]
    fn test_diff_pure_insert_and_delete() {
        assert_eq!(
            unified_diff("", "new"),
            "--- before\n+++ after\n@@ -0,0 +1 @@\n+new"
        );
        assert_eq!(
            unified_diff("gone", ""),
            "--- before\n+++ after\n@@ -1 +0,0 @@\n-gone"
        );
    }

    #[test]
    fn test_diff_separate_hunks() {
        let before: Vec<String> = (1..=20).map(|i| format!("l{i}")).collect();
        let mut after = before.clone();
        after[1] = "X".into();
        after[17] = "Y".into();
        let d = unified_diff_labeled(&before.join("\n"), &after.join("\n"), "previous", "selected");
        assert!(d.starts_with("--- previous\n+++ selected\n"));
        assert_eq!(d.matches("@@ -").count(), 2);
        assert!(d.contains("\n-l2\n+X\n"));
        assert!(d.contains("\n-l18\n+Y\n"));
    }

    #[test]
    fn test_diff_large_drafts_with_small_change() {
        let before: Vec<String> = (0..20_000).map(|i| format!("line {i}")).collect();
        let mut after = before.clone();
        after[10_000] = "changed".into();
        let d = unified_diff(&before.join("\n"), &after.join("\n"));
        assert_eq!(
            d,
            "--- before\n+++ after\n@@ -9998,7 +9998,7 @@\n line 9997\n line 9998\n line 9999\n-line 10000\n+changed\n line 10001\n line 10002\n line 10003"
        );
    }

    #[test]
    fn test_diff_huge_rewrite_falls_back_to_block_replace() {
        let before: Vec<String> = (0..2_500).map(|i| format!("old {i}")).collect();
        let after: Vec<String> = (0..2_500).map(|i| format!("new {i}")).collect();
        let d = unified_diff(&before.join("\n"), &after.join("\n"));
        let lines: Vec<&str> = d.lines().collect();
        assert_eq!(lines[2], "@@ -1,2500 +1,2500 @@");
        assert_eq!(lines[3], "-old 0");
        assert_eq!(lines[2_502], "-old 2499");
        assert_eq!(lines[2_503], "+new 0");
        assert_eq!(lines.len(), 3 + 5_000);
    }
}
