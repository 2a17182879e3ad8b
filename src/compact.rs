use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::model::is_blank_row;
use crate::reconcile::{anchor_label, find_anchor};
use crate::sheets::{self, SheetStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactReport {
    pub anchor: Option<usize>,
    pub kept: usize,
    pub removed: usize,
}

pub fn surviving_rows(rows: &[Vec<String>], anchor_row: usize) -> (Vec<Vec<String>>, usize) {
    let below = rows.get(anchor_row..).unwrap_or_default();
    let kept: Vec<Vec<String>> = below
        .iter()
        .filter(|row| !is_blank_row(row))
        .cloned()
        .collect();
    // Trailing blank rows never come back from a read, so count only holes.
    let span = below
        .iter()
        .rposition(|row| !is_blank_row(row))
        .map_or(0, |i| i + 1);
    let removed = span - kept.len();
    (kept, removed)
}

/// Close the holes reconciliation leaves below the anchor for `date`.
///
/// Without holes the sheet is left untouched.
pub fn compact_below_anchor<S: SheetStore>(
    store: &S,
    sheet: &str,
    date: NaiveDate,
) -> Result<CompactReport> {
    let rows = store
        .get(&sheets::whole_sheet(sheet))
        .context("failed to read sheet")?;
    let label = anchor_label(date);
    let Some(anchor_row) = find_anchor(&rows, &label) else {
        warn!(date = %label, "no date anchor, nothing to compact");
        return Ok(CompactReport::default());
    };

    let (kept, removed) = surviving_rows(&rows, anchor_row);
    let report = CompactReport {
        anchor: Some(anchor_row),
        kept: kept.len(),
        removed,
    };
    if removed == 0 {
        info!(anchor = anchor_row, rows = kept.len(), "rows already contiguous");
        return Ok(report);
    }

    let first = anchor_row + 1;
    store
        .clear(&sheets::rows_from(sheet, first))
        .context("failed to clear rows below anchor")?;
    if !kept.is_empty() {
        store
            .update(&sheets::cell(sheet, "A", first), &kept)
            .context("failed to rewrite rows below anchor")?;
    }
    info!(anchor = anchor_row, kept = report.kept, removed, "rows compacted");
    Ok(report)
}
