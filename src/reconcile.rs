use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::model::{MatchKey, MatchRecord, header_row, is_blank_row};
use crate::sheets::{self, SheetStore};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn anchor_label(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn find_anchor(rows: &[Vec<String>], label: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row.first().is_some_and(|c| c == label))
        .map(|i| i + 1)
}

pub fn last_filled_row(rows: &[Vec<String>]) -> usize {
    rows.iter()
        .rposition(|row| !is_blank_row(row))
        .map_or(0, |i| i + 1)
}

pub fn ensure_header<S: SheetStore>(store: &S, sheet: &str) -> Result<(), StoreError> {
    let expected = header_row();
    let current = store.get(&sheets::header_range(sheet))?;
    if current.first() == Some(&expected) {
        return Ok(());
    }
    store.update(&sheets::cell(sheet, "A", 1), &[expected])?;
    info!("sheet header written");
    Ok(())
}

pub fn next_free_row<S: SheetStore>(store: &S, sheet: &str) -> Result<usize, StoreError> {
    let rows = store.get(&sheets::whole_sheet(sheet))?;
    Ok((last_filled_row(&rows) + 1).max(2))
}

/// Row of the anchor for `date`, appending it after the last filled row when
/// the first column does not contain it yet.
pub fn ensure_date_anchor<S: SheetStore>(
    store: &S,
    sheet: &str,
    date: NaiveDate,
) -> Result<usize, StoreError> {
    let label = anchor_label(date);
    let column = store.get(&sheets::first_column(sheet))?;
    if let Some(row) = find_anchor(&column, &label) {
        return Ok(row);
    }
    let row = next_free_row(store, sheet)?;
    store.update(&sheets::cell(sheet, "A", row), &[vec![label.clone()]])?;
    info!(date = %label, row, "date anchor added");
    Ok(row)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub deletes: Vec<usize>,
    pub updates: Vec<(usize, MatchRecord)>,
    pub inserts: Vec<(usize, MatchRecord)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub deleted: usize,
    pub updated: usize,
    pub inserted: usize,
    pub failed: usize,
}

pub fn existing_matches(rows: &[Vec<String>], anchor_row: usize) -> HashMap<MatchKey, usize> {
    let last = last_filled_row(rows);
    let mut out = HashMap::new();
    for idx in anchor_row..last {
        let row = &rows[idx];
        if row.len() <= 2 || row[1].trim().is_empty() || row[2].trim().is_empty() {
            continue;
        }
        let key = (row[1].clone(), row[2].clone());
        if let Some(prev) = out.insert(key, idx + 1) {
            warn!(row = prev, "duplicate match row below anchor, later row wins");
        }
    }
    out
}

/// Diff `incoming` against the rows of the whole sheet (`rows[0]` is row 1).
///
/// Duplicate keys in `incoming` collapse to the last record carrying them,
/// positioned where the key first appeared.
pub fn plan_reconciliation(
    rows: &[Vec<String>],
    anchor_row: usize,
    incoming: &[MatchRecord],
) -> ReconcilePlan {
    let existing = existing_matches(rows, anchor_row);

    let mut order: Vec<MatchKey> = Vec::with_capacity(incoming.len());
    let mut latest: HashMap<MatchKey, &MatchRecord> = HashMap::with_capacity(incoming.len());
    for record in incoming {
        let key = record.key();
        if latest.insert(key.clone(), record).is_some() {
            warn!(team1 = %key.0, team2 = %key.1, "duplicate match in scrape, keeping last");
        } else {
            order.push(key);
        }
    }
    let wanted: HashSet<&MatchKey> = order.iter().collect();

    let mut deletes: Vec<usize> = existing
        .iter()
        .filter(|(key, _)| !wanted.contains(key))
        .map(|(_, row)| *row)
        .collect();
    deletes.sort_unstable_by(|a, b| b.cmp(a));

    let mut updates = Vec::new();
    let mut inserts = Vec::new();
    let mut cursor = last_filled_row(rows).max(anchor_row);
    for key in &order {
        let record = latest[key].clone();
        match existing.get(key) {
            Some(row) => updates.push((*row, record)),
            None => {
                cursor += 1;
                inserts.push((cursor, record));
            }
        }
    }

    ReconcilePlan {
        deletes,
        updates,
        inserts,
    }
}

/// Delete/update/insert `incoming` below the anchor for `date`.
///
/// Failing writes are logged and counted; earlier writes stay in place.
pub fn reconcile<S: SheetStore>(
    store: &S,
    sheet: &str,
    date: NaiveDate,
    incoming: &[MatchRecord],
) -> Result<ReconcileReport> {
    if incoming.is_empty() {
        warn!("no matches to reconcile, sheet left untouched");
        return Ok(ReconcileReport::default());
    }

    if let Err(err) = ensure_header(store, sheet) {
        warn!(error = %err, "header check failed");
    }
    ensure_date_anchor(store, sheet, date).context("failed to ensure date anchor")?;

    let rows = store
        .get(&sheets::whole_sheet(sheet))
        .context("failed to read sheet")?;
    let label = anchor_label(date);
    let Some(anchor_row) = find_anchor(&rows, &label) else {
        error!(date = %label, "date anchor missing right after it was ensured");
        anyhow::bail!("date anchor {label} not found");
    };

    let plan = plan_reconciliation(&rows, anchor_row, incoming);
    let report = apply_plan(store, sheet, &plan);
    info!(
        deleted = report.deleted,
        updated = report.updated,
        inserted = report.inserted,
        failed = report.failed,
        "sheet reconciled"
    );
    Ok(report)
}

pub fn apply_plan<S: SheetStore>(store: &S, sheet: &str, plan: &ReconcilePlan) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for row in &plan.deletes {
        match store.clear(&sheets::row_range(sheet, *row)) {
            Ok(()) => report.deleted += 1,
            Err(err) => {
                report.failed += 1;
                error!(row, error = %err, "failed to clear stale row");
            }
        }
    }
    if !plan.deletes.is_empty() {
        info!(rows = ?plan.deletes, "stale rows cleared");
    }

    for (row, record) in &plan.updates {
        match write_match(store, sheet, *row, record) {
            Ok(()) => report.updated += 1,
            Err(err) => {
                report.failed += 1;
                error!(row, error = %err, "failed to update match row");
            }
        }
    }

    for (row, record) in &plan.inserts {
        match write_match(store, sheet, *row, record) {
            Ok(()) => {
                report.inserted += 1;
                info!(row, team1 = %record.team1, team2 = %record.team2, "match row added");
            }
            Err(err) => {
                report.failed += 1;
                error!(row, error = %err, "failed to add match row");
            }
        }
    }

    report
}

/// Evening seeding: header, anchor, then every match appended in one write
/// after the last filled row. No diff against existing rows.
pub fn append_matches<S: SheetStore>(
    store: &S,
    sheet: &str,
    date: NaiveDate,
    incoming: &[MatchRecord],
) -> Result<usize> {
    if incoming.is_empty() {
        warn!("no matches to write, sheet left untouched");
        return Ok(0);
    }

    if let Err(err) = ensure_header(store, sheet) {
        warn!(error = %err, "header check failed");
    }
    ensure_date_anchor(store, sheet, date).context("failed to ensure date anchor")?;
    let start = next_free_row(store, sheet).context("failed to find first free row")?;

    let rows: Vec<Vec<String>> = incoming.iter().map(MatchRecord::to_cells).collect();
    store
        .update(&sheets::cell(sheet, "B", start), &rows)
        .context("failed to write matches")?;
    info!(start, rows = rows.len(), "matches written");
    Ok(rows.len())
}

fn write_match<S: SheetStore>(
    store: &S,
    sheet: &str,
    row: usize,
    record: &MatchRecord,
) -> Result<(), StoreError> {
    store.update(&sheets::cell(sheet, "B", row), &[record.to_cells()])
}

#[cfg(test)]
mod tests {
    use super::{existing_matches, find_anchor, last_filled_row, plan_reconciliation};
    use crate::model::MatchRecord;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn record(team1: &str, team2: &str, odds: f64) -> MatchRecord {
        MatchRecord {
            team1: team1.to_string(),
            team2: team2.to_string(),
            favorite_odds: odds,
            over_under_25: 1.9,
            first_half_over_05: 1.35,
            country: "ENGLAND".to_string(),
            league: "Premier League".to_string(),
            team1_value: None,
            team2_value: None,
        }
    }

    fn sheet() -> Vec<Vec<String>> {
        vec![
            row(&["date", "team1", "team2"]),
            row(&["2026-10-18"]),
            row(&["", "X", "Y", "1.5"]),
            row(&["2026-10-19"]),
            row(&["", "A", "B", "1.6"]),
            row(&["", "C", "D", "1.4"]),
        ]
    }

    #[test]
    fn anchor_and_last_row_are_one_based() {
        let rows = sheet();
        assert_eq!(find_anchor(&rows, "2026-10-19"), Some(4));
        assert_eq!(find_anchor(&rows, "2026-10-20"), None);
        assert_eq!(last_filled_row(&rows), 6);
        assert_eq!(last_filled_row(&[row(&["x"]), row(&[" "]), vec![]]), 1);
    }

    #[test]
    fn existing_rows_only_below_anchor() {
        let existing = existing_matches(&sheet(), 4);
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[&("A".to_string(), "B".to_string())], 5);
        assert_eq!(existing[&("C".to_string(), "D".to_string())], 6);
    }

    #[test]
    fn plan_deletes_updates_and_appends_after_last_row() {
        let incoming = vec![record("C", "D", 1.45), record("E", "F", 1.3)];
        let plan = plan_reconciliation(&sheet(), 4, &incoming);
        assert_eq!(plan.deletes, vec![5]);
        assert_eq!(plan.updates, vec![(6, incoming[0].clone())]);
        assert_eq!(plan.inserts, vec![(7, incoming[1].clone())]);
    }

    #[test]
    fn duplicate_incoming_keys_keep_last_record_in_first_slot() {
        let incoming = vec![
            record("E", "F", 1.3),
            record("G", "H", 1.2),
            record("E", "F", 1.1),
        ];
        let plan = plan_reconciliation(&sheet(), 4, &incoming);
        assert_eq!(plan.inserts.len(), 2);
        assert_eq!(plan.inserts[0].0, 7);
        assert_eq!(plan.inserts[0].1.favorite_odds, 1.1);
        assert_eq!(plan.inserts[1].1.team1, "G");
    }

    #[test]
    fn deletes_are_descending() {
        let mut rows = sheet();
        rows.push(row(&["", "K", "L", "1.2"]));
        let plan = plan_reconciliation(&rows, 4, &[record("Z", "W", 1.1)]);
        assert_eq!(plan.deletes, vec![7, 6, 5]);
        assert_eq!(plan.inserts[0].0, 8);
    }
}
