#![allow(dead_code)]

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use scraper::{Html, Selector};

use matchsheet::browser::{Browser, Locator, Page};
use matchsheet::error::{PageError, StoreError};
use matchsheet::flashscore::BASE_URL;
use matchsheet::sheets::{MemorySheet, SheetStore};
use matchsheet::valuation::search_url;

pub const ODDS_TAB: &str = "//div[contains(@class, 'filters__tab') and .//div[text()='Odds']]";

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn match_url(slug: &str) -> String {
    format!("{BASE_URL}match/{slug}/")
}

/// A URL's initial HTML plus the HTML each click switches to.
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub html: String,
    pub clicks: HashMap<String, String>,
}

impl Route {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            clicks: HashMap::new(),
        }
    }

    pub fn on_click(mut self, locator: &str, html: impl Into<String>) -> Self {
        self.clicks.insert(locator.to_string(), html.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct BrowserLog {
    pub visited: Vec<String>,
    pub filled: Vec<(String, String)>,
    pub opened: usize,
    pub closed: usize,
}

/// Scripted browser: pages never wait, missing elements time out at once.
#[derive(Default)]
pub struct FakeBrowser {
    routes: Rc<HashMap<String, Route>>,
    log: Rc<RefCell<BrowserLog>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: impl Into<String>, route: Route) -> Self {
        Rc::make_mut(&mut self.routes).insert(url.into(), route);
        self
    }

    pub fn log(&self) -> Ref<'_, BrowserLog> {
        self.log.borrow()
    }

    pub fn visited(&self, url: &str) -> bool {
        self.log.borrow().visited.iter().any(|v| v == url)
    }
}

impl Browser for FakeBrowser {
    type Page = FakePage;

    fn new_page(&self) -> Result<FakePage, PageError> {
        self.log.borrow_mut().opened += 1;
        Ok(FakePage {
            routes: Rc::clone(&self.routes),
            log: Rc::clone(&self.log),
            url: None,
            html: String::new(),
        })
    }
}

pub struct FakePage {
    routes: Rc<HashMap<String, Route>>,
    log: Rc<RefCell<BrowserLog>>,
    url: Option<String>,
    html: String,
}

impl FakePage {
    fn route(&self) -> Option<&Route> {
        self.url.as_ref().and_then(|url| self.routes.get(url))
    }

    fn has(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Css(css) => {
                let Ok(selector) = Selector::parse(css) else {
                    return false;
                };
                Html::parse_document(&self.html).select(&selector).next().is_some()
            }
            Locator::XPath(expr) => self.route().is_some_and(|r| r.clicks.contains_key(expr)),
        }
    }
}

impl Page for FakePage {
    fn goto(&mut self, url: &str) -> Result<(), PageError> {
        self.log.borrow_mut().visited.push(url.to_string());
        let Some(route) = self.routes.get(url) else {
            return Err(PageError::Navigation {
                url: url.to_string(),
                reason: "no route".to_string(),
            });
        };
        self.html = route.html.clone();
        self.url = Some(url.to_string());
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<(), PageError> {
        if self.has(locator) {
            Ok(())
        } else {
            Err(PageError::Timeout {
                locator: locator.to_string(),
                timeout,
            })
        }
    }

    fn click(&mut self, locator: &Locator) -> Result<(), PageError> {
        let next = self
            .route()
            .and_then(|r| r.clicks.get(locator.as_str()))
            .cloned();
        match next {
            Some(html) => {
                self.html = html;
                Ok(())
            }
            None if self.has(locator) => Ok(()),
            None => Err(PageError::ElementNotFound(locator.to_string())),
        }
    }

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), PageError> {
        if !self.has(locator) {
            return Err(PageError::ElementNotFound(locator.to_string()));
        }
        self.log
            .borrow_mut()
            .filled
            .push((locator.as_str().to_string(), value.to_string()));
        Ok(())
    }

    fn content(&mut self) -> Result<String, PageError> {
        Ok(self.html.clone())
    }
}

impl Drop for FakePage {
    fn drop(&mut self) {
        self.log.borrow_mut().closed += 1;
    }
}

/// Main page that switches to the match list fixture on the odds tab.
pub fn main_route() -> Route {
    let list = read_fixture("match_list.html");
    Route::new(r#"<html><body><div class="filters__tab"><div>All</div></div></body></html>"#)
        .on_click(ODDS_TAB, list.clone())
        .on_click("button.calendar__navigation--tomorrow", list)
}

/// Detail page walking header, odds comparison, over/under and first half.
/// `over_25 = None` leaves the 2.5 line out of the table.
pub fn detail_route(header: &str, over_25: Option<&str>, first_half: &str) -> Route {
    let base = format!(
        r##"<div class="tournamentHeader__country">{header}</div>
<a href="#/odds-comparison"><button>Odds</button></a>"##
    );
    let comparison = format!(
        r##"{base}<a href="#/odds-comparison/over-under">Over/Under</a>"##
    );
    let line_25 = over_25
        .map(|price| {
            format!(
                r#"<div class="ui-table__row"><span class="oddsCell__noOddsCell">2.5</span><a class="oddsCell__odd"><span>{price}</span></a></div>"#
            )
        })
        .unwrap_or_default();
    let over_under = format!(
        r#"{comparison}<a title="1st Half">1st Half</a>
<div class="oddsTab__tableWrapper">
  <div class="ui-table__row"><span class="oddsCell__noOddsCell">1.5</span><a class="oddsCell__odd"><span>1.22</span></a></div>
  {line_25}
  <div class="ui-table__row"><span class="oddsCell__noOddsCell">3.5</span><a class="oddsCell__odd"><span>2.75</span></a></div>
</div>"#
    );
    let half = format!(
        r#"{base}<div class="oddsTab__tableWrapper">
  <div class="ui-table__row"><span class="oddsCell__noOddsCell">0.5</span><a class="oddsCell__odd"><span>{first_half}</span></a></div>
</div>"#
    );

    Route::new(format!("<html><body>{base}</body></html>"))
        .on_click("a[href='#/odds-comparison'] > button", comparison)
        .on_click("a[href='#/odds-comparison/over-under']", over_under)
        .on_click("a[title='1st Half']", half)
}

/// Search result page leading to a club page showing `value`.
pub fn with_valuation(browser: FakeBrowser, club: &str, country: &str, value: &str) -> FakeBrowser {
    let club_page = format!("https://www.transfermarkt.com/{}/startseite", club.to_lowercase().replace(' ', "-"));
    let search = format!(
        r#"<div id="search"><div class="yuRUbf"><a href="{club_page}"><h3>{club}</h3></a></div></div>"#
    );
    let page = format!(
        r#"<div class="data-header"><a class="data-header__market-value-wrapper">{value} <p class="data-header__last-update">Last update: Oct 1, 2026</p></a></div>"#
    );
    browser
        .route(search_url(club, country), Route::new(search))
        .route(club_page, Route::new(page))
}

/// Site with the fixture list and a detail page for every listed match.
pub fn standard_site() -> FakeBrowser {
    FakeBrowser::new()
        .route(BASE_URL, main_route())
        .route(
            match_url("arsenal-wolves"),
            detail_route("ENGLAND: Premier League - Round 9", Some("1.72"), "1.30"),
        )
        .route(
            match_url("everton-fulham"),
            detail_route("ENGLAND: Premier League - Round 9", Some("2.05"), "1.44"),
        )
        .route(
            match_url("burnley-liverpool"),
            detail_route("ENGLAND: Premier League - Round 9", Some("1.66"), "1.28"),
        )
        .route(
            match_url("bayern-bochum"),
            detail_route("GERMANY: Bundesliga - Round 7", Some("1.40"), "1.18"),
        )
        .route(
            match_url("barcelona-getafe"),
            detail_route("SPAIN: LaLiga - Round 10", Some("1.80"), "1.33"),
        )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    Update,
    Clear,
}

/// In-memory sheet whose chosen calls answer with an API error.
/// Every call is recorded, failed or not.
pub struct FailingStore {
    pub sheet: MemorySheet,
    failing: Vec<(StoreOp, String)>,
    calls: RefCell<Vec<(StoreOp, String)>>,
}

impl FailingStore {
    pub fn new(sheet: MemorySheet) -> Self {
        Self {
            sheet,
            failing: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn fail(mut self, op: StoreOp, range: impl Into<String>) -> Self {
        self.failing.push((op, range.into()));
        self
    }

    pub fn calls(&self) -> Vec<(StoreOp, String)> {
        self.calls.borrow().clone()
    }

    pub fn writes(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(op, _)| *op != StoreOp::Get)
            .count()
    }

    fn check(&self, op: StoreOp, range: &str) -> Result<(), StoreError> {
        self.calls.borrow_mut().push((op, range.to_string()));
        if self.failing.iter().any(|(o, r)| *o == op && r == range) {
            return Err(StoreError::Api {
                status: 503,
                message: format!("backend unavailable for {range}"),
            });
        }
        Ok(())
    }
}

impl SheetStore for FailingStore {
    fn get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        self.check(StoreOp::Get, range)?;
        self.sheet.get(range)
    }

    fn update(&self, range: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        self.check(StoreOp::Update, range)?;
        self.sheet.update(range, rows)
    }

    fn clear(&self, range: &str) -> Result<(), StoreError> {
        self.check(StoreOp::Clear, range)?;
        self.sheet.clear(range)
    }
}
