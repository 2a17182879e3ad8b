use std::time::Duration;

use reqwest::Url;
use tracing::{info, warn};

use crate::browser::{Browser, Document, Locator, Page};
use crate::error::PageError;
use crate::model::MatchRecord;

const SEARCH_URL: &str = "https://www.google.com/search";
const SEARCH_RESULTS: &str = "#search";
const FIRST_RESULT: &str = "div.yuRUbf a";
const MARKET_VALUE: &str = "a.data-header__market-value-wrapper";
const FOCAL_SITE: &str = "transfermarkt";

#[derive(Debug, Clone)]
pub struct ValuationTimeouts {
    pub search: Duration,
    pub club_page: Duration,
}

impl Default for ValuationTimeouts {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(5),
            club_page: Duration::from_secs(8),
        }
    }
}

/// Append `fc` unless a word of the name already is one.
pub fn club_search_name(club: &str) -> String {
    let has_suffix = club
        .split_whitespace()
        .any(|w| w.eq_ignore_ascii_case("fc"));
    if has_suffix {
        club.to_string()
    } else {
        format!("{club} fc")
    }
}

pub fn search_url(club: &str, country: &str) -> String {
    let query = format!(
        "{} {FOCAL_SITE} {}",
        club_search_name(club),
        country.to_lowercase()
    );
    match Url::parse_with_params(SEARCH_URL, &[("q", query.as_str()), ("hl", "en")]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{SEARCH_URL}?q={}&hl=en", query.replace(' ', "+")),
    }
}

pub fn parse_first_result(html: &str) -> Option<String> {
    let doc = Document::parse(html);
    let link = doc.select_first(FIRST_RESULT).ok()?;
    link.value()
        .attr("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string)
}

/// First line of the header market-value label.
pub fn parse_market_value(html: &str) -> Option<String> {
    let doc = Document::parse(html);
    let text = doc.text_of(MARKET_VALUE).ok()?;
    text.lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
}

/// Resolve one club's market value. Any failure yields `None`.
pub fn club_market_value<B: Browser>(
    browser: &B,
    club: &str,
    country: &str,
    timeouts: &ValuationTimeouts,
) -> Option<String> {
    match lookup(browser, club, country, timeouts) {
        Ok(Some(value)) => {
            info!(club, value = %value, "market value found");
            Some(value)
        }
        Ok(None) => {
            info!(club, "market value not on club page");
            None
        }
        Err(err) => {
            warn!(club, error = %err, "market value lookup failed");
            None
        }
    }
}

fn lookup<B: Browser>(
    browser: &B,
    club: &str,
    country: &str,
    timeouts: &ValuationTimeouts,
) -> Result<Option<String>, PageError> {
    let mut page = browser.new_page()?;
    let url = search_url(club, country);
    info!(club, url = %url, "searching club");
    page.goto(&url)?;
    page.wait_for(&Locator::css(SEARCH_RESULTS), timeouts.search)?;

    let first = parse_first_result(&page.content()?)
        .ok_or_else(|| PageError::ElementNotFound(format!("search result for {club}")))?;
    page.goto(&first)?;
    page.wait_for(&Locator::css(MARKET_VALUE), timeouts.club_page)?;

    Ok(parse_market_value(&page.content()?))
}

/// Fill `team1_value` and `team2_value` of every record. Each club is looked
/// up on its own, even when it already appeared in another match.
pub fn enrich_matches<B: Browser>(
    browser: &B,
    matches: &mut [MatchRecord],
    timeouts: &ValuationTimeouts,
) {
    for record in matches.iter_mut() {
        record.team1_value = club_market_value(browser, &record.team1, &record.country, timeouts);
        record.team2_value = club_market_value(browser, &record.team2, &record.country, timeouts);
    }
}
