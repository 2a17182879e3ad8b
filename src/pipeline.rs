use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::browser::{Browser, Page};
use crate::extractor::{ScanPolicy, extract_matches};
use crate::flashscore::{self, Credentials, SiteTimeouts};
use crate::leagues::PinnedLeagues;
use crate::model::MatchRecord;
use crate::valuation::{ValuationTimeouts, enrich_matches};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub base_url: String,
    /// `None` browses anonymously.
    pub credentials: Option<Credentials>,
    pub next_day: bool,
    pub policy: ScanPolicy,
    pub site_timeouts: SiteTimeouts,
    pub valuation_timeouts: ValuationTimeouts,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            base_url: flashscore::BASE_URL.to_string(),
            credentials: None,
            next_day: false,
            policy: ScanPolicy::default(),
            site_timeouts: SiteTimeouts::default(),
            valuation_timeouts: ValuationTimeouts::default(),
        }
    }
}

/// Run one scraping session and return the enriched match set.
pub fn collect_matches<B: Browser>(browser: &B, opts: &PipelineOptions) -> Result<Vec<MatchRecord>> {
    let mut main = browser.new_page().context("failed to open main tab")?;
    main.goto(&opts.base_url)
        .with_context(|| format!("failed to open {}", opts.base_url))?;

    if let Some(creds) = opts.credentials.as_ref() {
        flashscore::login(&mut main, creds, &opts.site_timeouts)
            .context("authentication failed, check email and password")?;
    } else {
        info!("no credentials configured, browsing anonymously");
    }

    flashscore::open_odds_tab(&mut main, &opts.site_timeouts).context("failed to switch to odds tab")?;
    if opts.next_day {
        flashscore::switch_to_next_day(&mut main, &opts.site_timeouts);
    }

    let html = main.content().context("failed to read match list")?;
    let pinned = PinnedLeagues::from_menu_html(&html);
    if pinned.is_empty() {
        warn!("no pinned leagues found in menu");
    } else {
        info!(leagues = pinned.len(), "pinned leagues loaded");
    }

    let rows = flashscore::parse_match_rows(&html);
    info!(rows = rows.len(), "match list loaded");

    let report = extract_matches(browser, &rows, &pinned, opts.policy, &opts.site_timeouts);
    let mut matches = report.matches;
    enrich_matches(browser, &mut matches, &opts.valuation_timeouts);

    info!(matches = matches.len(), "matches collected");
    Ok(matches)
}
