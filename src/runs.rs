use std::fmt;

use chrono::{Days, NaiveDate};
use tracing::{error, info, warn};

use crate::browser::Browser;
use crate::compact::{CompactReport, compact_below_anchor};
use crate::model::MatchRecord;
use crate::pipeline::{PipelineOptions, collect_matches};
use crate::reconcile::{ReconcileReport, anchor_label, append_matches, reconcile};
use crate::sheets::SheetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    Morning,
    Evening,
}

impl RunKind {
    pub fn target_date(self, today: NaiveDate) -> NaiveDate {
        match self {
            RunKind::Morning => today,
            RunKind::Evening => today.checked_add_days(Days::new(1)).unwrap_or(today),
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Morning => f.write_str("morning"),
            RunKind::Evening => f.write_str("evening"),
        }
    }
}

pub struct RunContext<S> {
    pub kind: RunKind,
    pub sheet_id: String,
    pub sheet_name: String,
    pub store: S,
    pub target_date: NaiveDate,
    pub pipeline: PipelineOptions,
}

impl<S: SheetStore> RunContext<S> {
    pub fn new(
        kind: RunKind,
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        store: S,
        today: NaiveDate,
        mut pipeline: PipelineOptions,
    ) -> Self {
        pipeline.next_day = kind == RunKind::Evening;
        Self {
            kind,
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
            store,
            target_date: kind.target_date(today),
            pipeline,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub matches: Vec<MatchRecord>,
    pub reconciled: Option<ReconcileReport>,
    pub compacted: Option<CompactReport>,
    pub appended: usize,
}

pub fn run<B: Browser, S: SheetStore>(browser: &B, ctx: &RunContext<S>) -> RunOutcome {
    match ctx.kind {
        RunKind::Morning => morning_run(browser, ctx),
        RunKind::Evening => evening_run(browser, ctx),
    }
}

/// Scrape today, reconcile the day's block, then close the holes.
pub fn morning_run<B: Browser, S: SheetStore>(browser: &B, ctx: &RunContext<S>) -> RunOutcome {
    let mut outcome = RunOutcome {
        matches: scrape(browser, ctx),
        ..RunOutcome::default()
    };
    if outcome.matches.is_empty() {
        warn!(run = %ctx.kind, "no matches collected, sheet left untouched");
        return outcome;
    }

    match reconcile(&ctx.store, &ctx.sheet_name, ctx.target_date, &outcome.matches) {
        Ok(report) => outcome.reconciled = Some(report),
        Err(err) => {
            error!(run = %ctx.kind, error = %format!("{err:#}"), "reconciliation aborted");
            return outcome;
        }
    }

    match compact_below_anchor(&ctx.store, &ctx.sheet_name, ctx.target_date) {
        Ok(report) => outcome.compacted = Some(report),
        Err(err) => error!(run = %ctx.kind, error = %format!("{err:#}"), "compaction failed"),
    }
    outcome
}

/// Scrape tomorrow and append it under tomorrow's anchor.
pub fn evening_run<B: Browser, S: SheetStore>(browser: &B, ctx: &RunContext<S>) -> RunOutcome {
    let mut outcome = RunOutcome {
        matches: scrape(browser, ctx),
        ..RunOutcome::default()
    };
    if outcome.matches.is_empty() {
        warn!(run = %ctx.kind, "no matches collected, sheet left untouched");
        return outcome;
    }

    match append_matches(&ctx.store, &ctx.sheet_name, ctx.target_date, &outcome.matches) {
        Ok(written) => outcome.appended = written,
        Err(err) => error!(run = %ctx.kind, error = %format!("{err:#}"), "writing matches failed"),
    }
    outcome
}

fn scrape<B: Browser, S>(browser: &B, ctx: &RunContext<S>) -> Vec<MatchRecord> {
    info!(
        run = %ctx.kind,
        sheet = %ctx.sheet_id,
        date = %anchor_label(ctx.target_date),
        "run started"
    );
    match collect_matches(browser, &ctx.pipeline) {
        Ok(matches) => matches,
        Err(err) => {
            error!(run = %ctx.kind, error = %format!("{err:#}"), "scrape aborted");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{RunContext, RunKind};
    use crate::pipeline::PipelineOptions;
    use crate::sheets::MemorySheet;

    #[test]
    fn evening_targets_tomorrow_and_next_day_list() {
        let today = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let ctx = RunContext::new(
            RunKind::Evening,
            "id",
            "Sheet1",
            MemorySheet::new(),
            today,
            PipelineOptions::default(),
        );
        assert_eq!(ctx.target_date, NaiveDate::from_ymd_opt(2027, 1, 1).unwrap());
        assert!(ctx.pipeline.next_day);

        let morning = RunContext::new(
            RunKind::Morning,
            "id",
            "Sheet1",
            MemorySheet::new(),
            today,
            PipelineOptions {
                next_day: true,
                ..PipelineOptions::default()
            },
        );
        assert_eq!(morning.target_date, today);
        assert!(!morning.pipeline.next_day);
    }
}
