use std::collections::{HashMap, HashSet};

use scraper::{Html, Selector};

const MENU_LINK_SELECTOR: &str = "a.leftMenu__href";
const FOOTBALL_PREFIX: &str = "/football/";

/// Leagues the logged-in account has pinned in the site's left menu.
#[derive(Debug, Clone, Default)]
pub struct PinnedLeagues {
    by_country: HashMap<String, HashSet<String>>,
}

impl PinnedLeagues {
    /// Build the index from the page HTML holding the pinned-league menu.
    pub fn from_menu_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let Ok(selector) = Selector::parse(MENU_LINK_SELECTOR) else {
            return Self::default();
        };
        let mut out = Self::default();
        for link in document.select(&selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if let Some((country, league)) = parse_menu_href(href) {
                out.insert(country, league);
            }
        }
        out
    }

    pub fn insert(&mut self, country: &str, league: &str) {
        let country = normalize_slug(country);
        let league = normalize_slug(league);
        if country.is_empty() || league.is_empty() {
            return;
        }
        self.by_country.entry(country).or_default().insert(league);
    }

    pub fn is_pinned(&self, country: &str, league: &str) -> bool {
        self.by_country
            .get(&normalize_slug(country))
            .is_some_and(|leagues| leagues.contains(&normalize_slug(league)))
    }

    pub fn len(&self) -> usize {
        self.by_country.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `/football/england/premier-league/` -> `("england", "premier-league")`.
pub fn parse_menu_href(href: &str) -> Option<(&str, &str)> {
    let rest = href.strip_prefix(FOOTBALL_PREFIX)?;
    let mut parts = rest.split('/');
    let country = parts.next().filter(|s| !s.is_empty())?;
    let league = parts.next().filter(|s| !s.is_empty())?;
    Some((country, league))
}

/// Lower-case, spaces to hyphens, periods removed.
pub fn normalize_slug(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .replace('.', "")
}

#[cfg(test)]
mod tests {
    use super::{PinnedLeagues, normalize_slug, parse_menu_href};

    #[test]
    fn slug_normalization_collapses_case_and_spaces() {
        assert_eq!(normalize_slug("Premier League"), "premier-league");
        assert_eq!(normalize_slug("premier league"), "premier-league");
        assert_eq!(normalize_slug(" 2. Bundesliga "), "2-bundesliga");
    }

    #[test]
    fn menu_href_yields_country_and_league() {
        assert_eq!(
            parse_menu_href("/football/england/premier-league/"),
            Some(("england", "premier-league"))
        );
        assert_eq!(parse_menu_href("/tennis/atp-singles/wimbledon/"), None);
        assert_eq!(parse_menu_href("/football/england/"), None);
    }

    #[test]
    fn menu_html_builds_index() {
        let html = r#"
<div id="my-leagues-list">
  <a class="leftMenu__href" href="/football/england/premier-league/">Premier League</a>
  <a class="leftMenu__href" href="/football/spain/laliga/">LaLiga</a>
  <a class="leftMenu__href" href="/basketball/usa/nba/">NBA</a>
  <a class="leftMenu__href">broken</a>
</div>"#;
        let pinned = PinnedLeagues::from_menu_html(html);
        assert_eq!(pinned.len(), 2);
        assert!(pinned.is_pinned("england", "premier-league"));
        assert!(pinned.is_pinned("ENGLAND", "Premier League"));
        assert!(pinned.is_pinned("Spain", "LaLiga"));
        assert!(!pinned.is_pinned("usa", "nba"));
        assert!(!pinned.is_pinned("england", "championship"));
    }
}
