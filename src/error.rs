use std::time::Duration;

use thiserror::Error;

/// Failures raised by a browser page driver.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("timed out after {timeout:?} waiting for {locator}")]
    Timeout { locator: String, timeout: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("driver error: {0}")]
    Driver(String),
}

impl PageError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PageError::Timeout { .. })
    }
}

/// Failures raised by a spreadsheet store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sheets request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheets api {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid sheets response: {0}")]
    Decode(String),

    #[error("invalid range {0}")]
    Range(String),
}
