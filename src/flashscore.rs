use std::time::Duration;

use reqwest::Url;
use tracing::{info, warn};

use crate::browser::{
    Document, Locator, Page, element_text, select_all_in, select_in, wait_and_click,
};
use crate::error::PageError;
use crate::odds::parse_odd;

pub const BASE_URL: &str = "https://www.flashscore.com/";

const MATCH_ROW: &str = ".event__match";
const PARTICIPANT: &str = ".event__participant";
const ODD_CELL: &str = ".odds__odd";
const LEAGUE_HEADER: &str = ".tournamentHeader__country";
const ODDS_TABLE: &str = ".oddsTab__tableWrapper";
const TABLE_ROW: &str = ".ui-table__row";
const THRESHOLD_CELL: &str = ".oddsCell__noOddsCell";
const PRICE_CELL: &str = ".oddsCell__odd";

const OVER_UNDER_LINE: f64 = 2.5;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SiteTimeouts {
    pub login_step: Duration,
    pub login_confirm: Duration,
    pub odds_tab: Duration,
    pub match_list: Duration,
    pub next_day: Duration,
    pub detail_step: Duration,
}

impl Default for SiteTimeouts {
    fn default() -> Self {
        Self {
            login_step: Duration::from_secs(15),
            login_confirm: Duration::from_secs(8),
            odds_tab: Duration::from_secs(8),
            match_list: Duration::from_secs(10),
            next_day: Duration::from_secs(5),
            detail_step: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRow {
    pub team1: String,
    pub team2: String,
    pub link: Option<String>,
    pub raw_odds: Vec<String>,
}

pub fn login<P: Page>(page: &mut P, creds: &Credentials, t: &SiteTimeouts) -> Result<(), PageError> {
    wait_and_click(page, &Locator::css("#user-menu"), t.login_step)?;
    page.wait_for(&Locator::css(".lsidDialog--login"), t.login_step)?;
    wait_and_click(page, &Locator::css("button.social__button.email"), t.login_step)?;

    let email = Locator::css("input#email");
    page.wait_for(&email, t.login_step)?;
    page.fill(&email, &creds.email)?;

    let password = Locator::css("input#passwd");
    page.wait_for(&password, t.login_step)?;
    page.fill(&password, &creds.password)?;

    wait_and_click(page, &Locator::css("button.lsidDialog__button"), t.login_step)?;
    page.wait_for(&Locator::css(".header__text--loggedIn"), t.login_confirm)?;
    info!("logged in");
    Ok(())
}

pub fn open_odds_tab<P: Page>(page: &mut P, t: &SiteTimeouts) -> Result<(), PageError> {
    let tab = Locator::xpath("//div[contains(@class, 'filters__tab') and .//div[text()='Odds']]");
    wait_and_click(page, &tab, t.odds_tab)?;
    page.wait_for(&Locator::css(MATCH_ROW), t.match_list)?;
    info!("switched to odds tab");
    Ok(())
}

/// Move the list to tomorrow. Failure leaves the list on today.
pub fn switch_to_next_day<P: Page>(page: &mut P, t: &SiteTimeouts) -> bool {
    let button = Locator::css("button.calendar__navigation--tomorrow");
    let result = wait_and_click(page, &button, t.next_day)
        .and_then(|_| page.wait_for(&Locator::css(MATCH_ROW), t.match_list));
    match result {
        Ok(()) => {
            info!("switched list to next day");
            true
        }
        Err(err) => {
            warn!(error = %err, "next day switch failed");
            false
        }
    }
}

pub fn parse_match_rows(html: &str) -> Vec<MatchRow> {
    let doc = Document::parse(html);
    let Ok(rows) = doc.select_all(MATCH_ROW) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let participants = select_all_in(&row, PARTICIPANT).unwrap_or_default();
        let (Some(home), Some(away)) = (participants.first(), participants.get(1)) else {
            warn!("match row without two participants");
            continue;
        };
        let team1 = element_text(home).replace('\n', " ");
        let team2 = element_text(away).replace('\n', " ");

        let link = select_in(&row, "a")
            .ok()
            .and_then(|a| a.value().attr("href"))
            .map(absolute_url);

        let mut raw_odds = Vec::new();
        for cell in select_all_in(&row, ODD_CELL).unwrap_or_default() {
            match select_in(&cell, "span") {
                Ok(span) => raw_odds.push(element_text(&span)),
                Err(_) => {
                    warn!(team1 = %team1, team2 = %team2, "odds cell without a price");
                    raw_odds.push(String::new());
                }
            }
        }

        out.push(MatchRow {
            team1,
            team2,
            link,
            raw_odds,
        });
    }
    out
}

/// `ENGLAND: Premier League - Round 10` -> `("ENGLAND", "Premier League")`.
pub fn parse_league_header(text: &str) -> Option<(String, String)> {
    let head = text.split(" - ").next()?;
    let (country, league) = head.split_once(':')?;
    let country = country.trim();
    let league = league.trim();
    if country.is_empty() || league.is_empty() {
        return None;
    }
    Some((country.to_string(), league.to_string()))
}

pub fn read_league_header<P: Page>(page: &mut P, t: &SiteTimeouts) -> Result<(String, String), PageError> {
    page.wait_for(&Locator::css(LEAGUE_HEADER), t.detail_step)?;
    let doc = Document::from_page(page)?;
    let text = doc.text_of(LEAGUE_HEADER)?;
    parse_league_header(&text.replace('\n', " "))
        .ok_or_else(|| PageError::ElementNotFound(format!("league in header `{text}`")))
}

/// Over price of the first table row whose total line is exactly 2.5.
pub fn parse_over_under_25(html: &str) -> Result<f64, PageError> {
    let doc = Document::parse(html);
    let table = doc.select_first(ODDS_TABLE)?;
    for row in select_all_in(&table, TABLE_ROW)? {
        let Ok(threshold) = select_in(&row, THRESHOLD_CELL) else {
            continue;
        };
        if parse_odd(&element_text(&threshold)) != Some(OVER_UNDER_LINE) {
            continue;
        }
        let price = select_in(&row, PRICE_CELL)?;
        return price_of(&element_text(&price));
    }
    Err(PageError::ElementNotFound("over/under 2.5 line".to_string()))
}

pub fn parse_first_half_over_05(html: &str) -> Result<f64, PageError> {
    let doc = Document::parse(html);
    let row = doc.select_first(TABLE_ROW)?;
    let cell = select_in(&row, PRICE_CELL)?;
    let span = select_in(&cell, "span")?;
    price_of(&element_text(&span))
}

/// Open the over/under comparison on a detail page and read both prices.
pub fn read_goal_odds<P: Page>(page: &mut P, t: &SiteTimeouts) -> Result<(f64, f64), PageError> {
    wait_and_click(page, &Locator::css("a[href='#/odds-comparison'] > button"), t.detail_step)?;
    wait_and_click(page, &Locator::css("a[href='#/odds-comparison/over-under']"), t.detail_step)?;
    page.wait_for(&Locator::css(ODDS_TABLE), t.detail_step)?;
    let over_under = parse_over_under_25(&page.content()?)?;

    wait_and_click(page, &Locator::css("a[title='1st Half']"), t.detail_step)?;
    page.wait_for(&Locator::css(TABLE_ROW), t.detail_step)?;
    let first_half = parse_first_half_over_05(&page.content()?)?;

    Ok((over_under, first_half))
}

fn price_of(text: &str) -> Result<f64, PageError> {
    parse_odd(text).ok_or_else(|| PageError::ElementNotFound(format!("price in `{text}`")))
}

fn absolute_url(href: &str) -> String {
    Url::parse(BASE_URL)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
