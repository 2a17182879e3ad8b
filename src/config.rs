use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use serde::Deserialize;

use crate::flashscore::Credentials;
use crate::webdriver::WebDriverConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "MATCHSHEET_CONFIG";

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sheet_id: String,
    pub sheet_name: String,
    pub user_email: String,
    pub password: String,
    pub morning_time: String,
    pub evening_time: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub sheets_token: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheet_id: String::new(),
            sheet_name: "Sheet1".to_string(),
            user_email: String::new(),
            password: String::new(),
            morning_time: "09:00".to_string(),
            evening_time: "21:00".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            sheets_token: String::new(),
            log_file: PathBuf::from("program.log"),
        }
    }
}

impl AppConfig {
    /// Read `path` (or the default location), then apply env overrides.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| opt_env(CONFIG_PATH_ENV).map(PathBuf::from));
        let mut cfg = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_overrides(opt_env);
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SHEET_ID") {
            self.sheet_id = val;
        }
        if let Some(val) = lookup("FLASHSCORE_EMAIL") {
            self.user_email = val;
        }
        if let Some(val) = lookup("FLASHSCORE_PASSWORD") {
            self.password = val;
        }
        if let Some(val) = lookup("GOOGLE_SHEETS_TOKEN") {
            self.sheets_token = val;
        }
        if let Some(val) = lookup("WEBDRIVER_URL") {
            self.webdriver_url = val;
        }
        if let Some(val) = lookup("WEBDRIVER_HEADLESS") {
            self.headless = matches!(val.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    pub fn validate(&self) -> Result<()> {
        parse_time(&self.morning_time).context("invalid morning_time")?;
        parse_time(&self.evening_time).context("invalid evening_time")?;
        if self.sheet_name.trim().is_empty() {
            bail!("sheet_name must not be empty");
        }
        Ok(())
    }

    /// Login is skipped when either half is missing.
    pub fn credentials(&self) -> Option<Credentials> {
        if self.user_email.trim().is_empty() || self.password.is_empty() {
            return None;
        }
        Some(Credentials {
            email: self.user_email.trim().to_string(),
            password: self.password.clone(),
        })
    }

    pub fn webdriver(&self) -> WebDriverConfig {
        WebDriverConfig {
            url: self.webdriver_url.clone(),
            headless: self.headless,
        }
    }
}

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT)
        .with_context(|| format!("expected HH:MM, got {raw:?}"))
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val)
        }
    })
}
