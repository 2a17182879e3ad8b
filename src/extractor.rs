use tracing::{debug, info, warn};

use crate::browser::{Browser, Page};
use crate::error::PageError;
use crate::flashscore::{self, MatchRow, SiteTimeouts};
use crate::leagues::PinnedLeagues;
use crate::model::MatchRecord;
use crate::odds::{favorite_odds, passes_gate};

/// How the scan reacts to a match from a league that is not pinned.
///
/// The list is grouped by league with pinned leagues first, so the first
/// unpinned match marks the end of the interesting part. Stopping there skips
/// any pinned match that would appear later in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPolicy {
    pub stop_on_first_unpinned: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            stop_on_first_unpinned: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub matches: Vec<MatchRecord>,
    pub scanned: usize,
    pub below_gate: usize,
    pub failed: usize,
    pub unpinned: usize,
    pub stopped_at: Option<usize>,
}

enum Detail {
    Extracted {
        over_under_25: f64,
        first_half_over_05: f64,
        country: String,
        league: String,
    },
    Unpinned {
        country: String,
        league: String,
    },
}

pub fn extract_matches<B: Browser>(
    browser: &B,
    rows: &[MatchRow],
    pinned: &PinnedLeagues,
    policy: ScanPolicy,
    timeouts: &SiteTimeouts,
) -> ExtractReport {
    let mut report = ExtractReport::default();

    for (idx, row) in rows.iter().enumerate() {
        report.scanned += 1;

        let Some(favorite) = favorite_odds(&row.raw_odds) else {
            warn!(team1 = %row.team1, team2 = %row.team2, "no favorite odds, skipping");
            continue;
        };
        if !passes_gate(favorite) {
            debug!(team1 = %row.team1, team2 = %row.team2, favorite, "above odds gate");
            continue;
        }
        report.below_gate += 1;
        info!(team1 = %row.team1, team2 = %row.team2, favorite, "favorite odds under gate");

        match inspect_match(browser, row, pinned, timeouts) {
            Ok(Detail::Extracted {
                over_under_25,
                first_half_over_05,
                country,
                league,
            }) => {
                info!(
                    team1 = %row.team1,
                    team2 = %row.team2,
                    over_under_25,
                    first_half_over_05,
                    "extracted match odds"
                );
                report.matches.push(MatchRecord {
                    team1: row.team1.clone(),
                    team2: row.team2.clone(),
                    favorite_odds: favorite,
                    over_under_25,
                    first_half_over_05,
                    country,
                    league,
                    team1_value: None,
                    team2_value: None,
                });
            }
            Ok(Detail::Unpinned { country, league }) => {
                report.unpinned += 1;
                if policy.stop_on_first_unpinned {
                    info!(%country, %league, "league not pinned, ending scan");
                    report.stopped_at = Some(idx);
                    break;
                }
                info!(%country, %league, "league not pinned, skipping match");
            }
            Err(err) => {
                report.failed += 1;
                log_detail_failure(row, &err);
            }
        }
    }

    info!(
        scanned = report.scanned,
        extracted = report.matches.len(),
        failed = report.failed,
        "match scan finished"
    );
    report
}

fn inspect_match<B: Browser>(
    browser: &B,
    row: &MatchRow,
    pinned: &PinnedLeagues,
    timeouts: &SiteTimeouts,
) -> Result<Detail, PageError> {
    let link = row
        .link
        .as_deref()
        .ok_or_else(|| PageError::ElementNotFound("match link".to_string()))?;

    let mut page = browser.new_page()?;
    page.goto(link)?;

    let (country, league) = flashscore::read_league_header(&mut page, timeouts)?;
    if !pinned.is_pinned(&country, &league) {
        return Ok(Detail::Unpinned { country, league });
    }

    let (over_under_25, first_half_over_05) = flashscore::read_goal_odds(&mut page, timeouts)?;
    Ok(Detail::Extracted {
        over_under_25,
        first_half_over_05,
        country,
        league,
    })
}

fn log_detail_failure(row: &MatchRow, err: &PageError) {
    let url = row.link.as_deref().unwrap_or("-");
    match err {
        err if err.is_timeout() => warn!(
            team1 = %row.team1,
            team2 = %row.team2,
            url,
            error = %err,
            "match page timed out, skipping"
        ),
        PageError::Navigation { .. } => warn!(
            team1 = %row.team1,
            team2 = %row.team2,
            url,
            error = %err,
            "match page unavailable, skipping"
        ),
        _ => warn!(
            team1 = %row.team1,
            team2 = %row.team2,
            url,
            error = %err,
            "match details missing, skipping"
        ),
    }
}
