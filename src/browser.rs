use std::fmt;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::error::PageError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Css(s) | Locator::XPath(s) => s,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css `{s}`"),
            Locator::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

/// One browser tab. Dropping the page closes the tab.
pub trait Page {
    fn goto(&mut self, url: &str) -> Result<(), PageError>;

    /// Block until `locator` matches an element or `timeout` elapses.
    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<(), PageError>;

    fn click(&mut self, locator: &Locator) -> Result<(), PageError>;

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), PageError>;

    fn content(&mut self) -> Result<String, PageError>;
}

pub trait Browser {
    type Page: Page;

    fn new_page(&self) -> Result<Self::Page, PageError>;
}

pub fn wait_and_click<P: Page>(
    page: &mut P,
    locator: &Locator,
    timeout: Duration,
) -> Result<(), PageError> {
    page.wait_for(locator, timeout)?;
    page.click(locator)
}

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_document(raw),
        }
    }

    pub fn from_page<P: Page>(page: &mut P) -> Result<Self, PageError> {
        let raw = page.content()?;
        Ok(Self::parse(&raw))
    }

    pub fn select_all(&self, css: &str) -> Result<Vec<ElementRef<'_>>, PageError> {
        let selector = selector(css)?;
        Ok(self.html.select(&selector).collect())
    }

    pub fn select_first(&self, css: &str) -> Result<ElementRef<'_>, PageError> {
        let selector = selector(css)?;
        self.html
            .select(&selector)
            .next()
            .ok_or_else(|| PageError::ElementNotFound(css.to_string()))
    }

    pub fn text_of(&self, css: &str) -> Result<String, PageError> {
        self.select_first(css).map(|el| element_text(&el))
    }
}

pub fn selector(css: &str) -> Result<Selector, PageError> {
    Selector::parse(css).map_err(|e| PageError::Driver(format!("bad selector `{css}`: {e}")))
}

pub fn select_in<'a>(scope: &ElementRef<'a>, css: &str) -> Result<ElementRef<'a>, PageError> {
    let selector = selector(css)?;
    scope
        .select(&selector)
        .next()
        .ok_or_else(|| PageError::ElementNotFound(css.to_string()))
}

pub fn select_all_in<'a>(scope: &ElementRef<'a>, css: &str) -> Result<Vec<ElementRef<'a>>, PageError> {
    let selector = selector(css)?;
    Ok(scope.select(&selector).collect())
}

/// Rendered-ish text: inline runs joined, block elements on their own lines,
/// whitespace collapsed, empty lines dropped.
pub fn element_text(el: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(el, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

const BLOCK_TAGS: &[&str] = &["p", "div", "br", "li", "tr", "td", "h1", "h2", "h3", "section"];

fn push_text(el: &ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let block = BLOCK_TAGS.contains(&child_el.value().name());
            if block {
                out.push('\n');
            }
            push_text(&child_el, out);
            if block {
                out.push('\n');
            }
        }
    }
}
