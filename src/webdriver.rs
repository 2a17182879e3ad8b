use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::browser::{Browser, Locator, Page};
use crate::error::PageError;
use crate::http_client::http_client;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub url: String,
    pub headless: bool,
}

struct Session {
    client: &'static Client,
    base: String,
    id: String,
    // Initial window, never closed. New tabs are opened from it.
    home: String,
    focused: RefCell<Option<String>>,
}

impl Session {
    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, PageError> {
        let url = format!("{}/session/{}{}", self.base, self.id, path);
        send(self.client, method, &url, body)
    }

    fn focus(&self, handle: &str) -> Result<(), PageError> {
        if self.focused.borrow().as_deref() == Some(handle) {
            return Ok(());
        }
        self.command(Method::POST, "/window", Some(json!({ "handle": handle })))?;
        *self.focused.borrow_mut() = Some(handle.to_string());
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let url = format!("{}/session/{}", self.base, self.id);
        if let Err(err) = send(self.client, Method::DELETE, &url, None) {
            warn!(error = %err, "failed to end webdriver session");
        }
    }
}

pub struct WebDriverBrowser {
    session: Rc<Session>,
}

impl WebDriverBrowser {
    pub fn connect(cfg: &WebDriverConfig) -> Result<Self, PageError> {
        let client = http_client().map_err(|e| PageError::Driver(e.to_string()))?;
        let base = cfg.url.trim_end_matches('/').to_string();

        let mut args = vec!["--disable-blink-features=AutomationControlled"];
        if cfg.headless {
            args.push("--headless=new");
        }
        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = send(client, Method::POST, &format!("{base}/session"), Some(caps))?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| PageError::Driver("session response without sessionId".to_string()))?
            .to_string();
        debug!(session = %id, "webdriver session started");

        let session_url = format!("{base}/session/{id}");
        let home = send(client, Method::GET, &format!("{session_url}/window"), None).and_then(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| PageError::Driver("window handle is not a string".to_string()))
        });
        let home = match home {
            Ok(handle) => handle,
            Err(err) => {
                let _ = send(client, Method::DELETE, &session_url, None);
                return Err(err);
            }
        };

        Ok(Self {
            session: Rc::new(Session {
                client,
                base,
                id,
                focused: RefCell::new(Some(home.clone())),
                home,
            }),
        })
    }
}

impl Browser for WebDriverBrowser {
    type Page = WebDriverPage;

    fn new_page(&self) -> Result<WebDriverPage, PageError> {
        self.session.focus(&self.session.home)?;
        let value = self
            .session
            .command(Method::POST, "/window/new", Some(json!({ "type": "tab" })))?;
        let handle = value
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| PageError::Driver("new window response without handle".to_string()))?
            .to_string();
        Ok(WebDriverPage {
            session: Rc::clone(&self.session),
            handle,
            url: None,
        })
    }
}

pub struct WebDriverPage {
    session: Rc<Session>,
    handle: String,
    url: Option<String>,
}

impl WebDriverPage {
    fn find(&self, locator: &Locator) -> Result<String, PageError> {
        self.session.focus(&self.handle)?;
        let (using, value) = match locator {
            Locator::Css(s) => ("css selector", s.as_str()),
            Locator::XPath(s) => ("xpath", s.as_str()),
        };
        let found = self
            .session
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": using, "value": value })),
            )
            .map_err(|err| match err {
                PageError::ElementNotFound(_) => PageError::ElementNotFound(locator.to_string()),
                other => other,
            })?;
        found
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PageError::Driver("element response without reference".to_string()))
    }
}

impl Page for WebDriverPage {
    fn goto(&mut self, url: &str) -> Result<(), PageError> {
        self.session.focus(&self.handle)?;
        self.session
            .command(Method::POST, "/url", Some(json!({ "url": url })))
            .map_err(|err| PageError::Navigation {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        self.url = Some(url.to_string());
        Ok(())
    }

    fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> Result<(), PageError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator) {
                Ok(_) => return Ok(()),
                Err(PageError::ElementNotFound(_)) => {}
                Err(err) => return Err(err),
            }
            if Instant::now() >= deadline {
                return Err(PageError::Timeout {
                    locator: locator.to_string(),
                    timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn click(&mut self, locator: &Locator) -> Result<(), PageError> {
        let id = self.find(locator)?;
        self.session
            .command(Method::POST, &format!("/element/{id}/click"), Some(json!({})))?;
        Ok(())
    }

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), PageError> {
        let id = self.find(locator)?;
        self.session
            .command(Method::POST, &format!("/element/{id}/clear"), Some(json!({})))?;
        self.session.command(
            Method::POST,
            &format!("/element/{id}/value"),
            Some(json!({ "text": value })),
        )?;
        Ok(())
    }

    fn content(&mut self) -> Result<String, PageError> {
        self.session.focus(&self.handle)?;
        let value = self.session.command(Method::GET, "/source", None)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PageError::Driver("page source is not a string".to_string()))
    }
}

impl Drop for WebDriverPage {
    fn drop(&mut self) {
        let closed = self
            .session
            .focus(&self.handle)
            .and_then(|_| self.session.command(Method::DELETE, "/window", None));
        *self.session.focused.borrow_mut() = None;
        if let Err(err) = closed {
            let url = self.url.as_deref().unwrap_or("-");
            warn!(url, error = %err, "failed to close tab");
        }
    }
}

fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, PageError> {
    let mut req = client.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req
        .send()
        .map_err(|e| PageError::Driver(format!("webdriver request failed: {e}")))?;
    let status = resp.status();
    let payload: Value = resp
        .json()
        .map_err(|e| PageError::Driver(format!("invalid webdriver response: {e}")))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    Err(driver_error(&value))
}

fn driver_error(value: &Value) -> PageError {
    let code = value.get("error").and_then(Value::as_str).unwrap_or("unknown error");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    match code {
        "no such element" => PageError::ElementNotFound(message),
        "timeout" => PageError::Timeout {
            locator: message,
            timeout: Duration::ZERO,
        },
        _ => PageError::Driver(format!("{code}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::driver_error;
    use crate::error::PageError;

    #[test]
    fn no_such_element_maps_to_not_found() {
        let err = driver_error(&json!({
            "error": "no such element",
            "message": "no such element: Unable to locate element\n  (Session info: chrome=120)"
        }));
        assert!(matches!(err, PageError::ElementNotFound(msg) if msg == "no such element: Unable to locate element"));
    }

    #[test]
    fn unknown_codes_keep_code_and_message() {
        let err = driver_error(&json!({ "error": "invalid session id", "message": "gone" }));
        assert_eq!(err.to_string(), "driver error: invalid session id: gone");
    }
}
