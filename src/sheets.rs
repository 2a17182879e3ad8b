use std::sync::Mutex;

use anyhow::Result;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::StoreError;
use crate::http_client::http_client;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub const LAST_COLUMN: &str = "Z";

/// Range-scoped read, overwrite and clear. No formulas, no formatting.
pub trait SheetStore {
    /// Row-major values. Trailing blank cells and trailing blank rows are
    /// omitted, blank rows in between come back empty.
    fn get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Overwrite starting at the range's top-left cell, values taken as typed.
    fn update(&self, range: &str, rows: &[Vec<String>]) -> Result<(), StoreError>;

    fn clear(&self, range: &str) -> Result<(), StoreError>;
}

impl<S: SheetStore + ?Sized> SheetStore for &S {
    fn get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        (**self).get(range)
    }

    fn update(&self, range: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        (**self).update(range, rows)
    }

    fn clear(&self, range: &str) -> Result<(), StoreError> {
        (**self).clear(range)
    }
}

// ---------------------------------------------------------------------------
// A1 notation
// ---------------------------------------------------------------------------

pub fn quote_sheet(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

pub fn cell(sheet: &str, column: &str, row: usize) -> String {
    format!("{}!{column}{row}", quote_sheet(sheet))
}

/// `Sheet1!A5:Z5`
pub fn row_range(sheet: &str, row: usize) -> String {
    format!("{}!A{row}:{LAST_COLUMN}{row}", quote_sheet(sheet))
}

pub fn rows_from(sheet: &str, row: usize) -> String {
    format!("{}!A{row}:{LAST_COLUMN}", quote_sheet(sheet))
}

/// `Sheet1!A:Z`
pub fn whole_sheet(sheet: &str) -> String {
    format!("{}!A:{LAST_COLUMN}", quote_sheet(sheet))
}

pub fn first_column(sheet: &str) -> String {
    format!("{}!A:A", quote_sheet(sheet))
}

pub fn header_range(sheet: &str) -> String {
    format!("{}!A1:{LAST_COLUMN}1", quote_sheet(sheet))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: Option<String>,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: Option<usize>,
    pub end_row: Option<usize>,
}

impl A1Range {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let bad = || StoreError::Range(raw.to_string());
        let (sheet, cells) = match raw.rsplit_once('!') {
            Some((sheet, cells)) => (Some(unquote_sheet(sheet)), cells),
            None => (None, raw),
        };

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (cells, None),
        };
        let (start_col, start_row) = parse_cell_ref(start).ok_or_else(bad)?;
        let start_col = start_col.ok_or_else(bad)?;

        let (end_col, end_row) = match end {
            Some(end) => parse_cell_ref(end).ok_or_else(bad)?,
            None => (Some(start_col), start_row),
        };

        Ok(Self {
            sheet,
            start_col,
            start_row: start_row.unwrap_or(1),
            end_col,
            end_row,
        })
    }
}

pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let n = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    Some(n - 1)
}

fn parse_cell_ref(raw: &str) -> Option<(Option<usize>, Option<usize>)> {
    let raw = raw.trim();
    let split = raw.find(|c: char| c.is_ascii_digit()).unwrap_or(raw.len());
    let (letters, digits) = raw.split_at(split);
    let col = if letters.is_empty() {
        None
    } else {
        Some(column_index(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok().filter(|r| *r > 0)?)
    };
    if col.is_none() && row.is_none() {
        return None;
    }
    Some((col, row))
}

fn unquote_sheet(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Google Sheets v4
// ---------------------------------------------------------------------------

pub struct GoogleSheetsClient {
    client: &'static Client,
    spreadsheet_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleSheetsClient {
    pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        })
    }

    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(SHEETS_API).map_err(|_| StoreError::Range(range.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Range(range.to_string()))?
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }

    fn execute(&self, req: reqwest::blocking::RequestBuilder) -> Result<String, StoreError> {
        let resp = req
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if status.is_success() {
            return Ok(body);
        }
        Err(StoreError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        })
    }
}

impl SheetStore for GoogleSheetsClient {
    fn get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(range, "")?;
        debug!(range, "sheets get");
        let body = self.execute(self.client.get(url))?;
        let parsed: ValueRange =
            serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(parsed
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn update(&self, range: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let mut url = self.values_url(range, "")?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        debug!(range, rows = rows.len(), "sheets update");
        let body = json!({ "majorDimension": "ROWS", "values": rows });
        self.execute(self.client.put(url).json(&body))?;
        Ok(())
    }

    fn clear(&self, range: &str) -> Result<(), StoreError> {
        let url = self.values_url(range, ":clear")?;
        debug!(range, "sheets clear");
        self.execute(self.client.post(url).json(&json!({})))?;
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(220).collect())
}

// ---------------------------------------------------------------------------
// In-memory sheet
// ---------------------------------------------------------------------------

/// A single-sheet store kept in memory. Reads follow the Google Sheets
/// trimming rules so callers see the same shapes as against the real API.
#[derive(Debug, Default)]
pub struct MemorySheet {
    grid: Mutex<Vec<Vec<String>>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let grid = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Self {
            grid: Mutex::new(grid),
        }
    }

    pub fn snapshot(&self) -> Vec<Vec<String>> {
        let grid = self.lock();
        trim_rows(grid.iter().map(|row| row.as_slice()).collect())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Vec<String>>> {
        self.grid.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SheetStore for MemorySheet {
    fn get(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let r = A1Range::parse(range)?;
        let grid = self.lock();
        let first = r.start_row - 1;
        let last = r.end_row.unwrap_or(grid.len()).min(grid.len());
        let rows = (first..last)
            .map(|i| {
                let row = &grid[i];
                let from = r.start_col.min(row.len());
                let to = r.end_col.map_or(row.len(), |c| (c + 1).min(row.len()));
                &row[from..to.max(from)]
            })
            .collect();
        Ok(trim_rows(rows))
    }

    fn update(&self, range: &str, rows: &[Vec<String>]) -> Result<(), StoreError> {
        let r = A1Range::parse(range)?;
        let mut grid = self.lock();
        for (i, values) in rows.iter().enumerate() {
            let row_idx = r.start_row - 1 + i;
            if grid.len() <= row_idx {
                grid.resize(row_idx + 1, Vec::new());
            }
            let row = &mut grid[row_idx];
            for (j, value) in values.iter().enumerate() {
                let col = r.start_col + j;
                if row.len() <= col {
                    row.resize(col + 1, String::new());
                }
                row[col] = value.clone();
            }
        }
        Ok(())
    }

    fn clear(&self, range: &str) -> Result<(), StoreError> {
        let r = A1Range::parse(range)?;
        let mut grid = self.lock();
        let first = r.start_row - 1;
        let last = r.end_row.unwrap_or(grid.len()).min(grid.len());
        for row in grid.iter_mut().take(last).skip(first) {
            let from = r.start_col.min(row.len());
            let to = r.end_col.map_or(row.len(), |c| (c + 1).min(row.len()));
            for cell in row.iter_mut().take(to).skip(from) {
                cell.clear();
            }
        }
        Ok(())
    }
}

fn trim_rows(rows: Vec<&[String]>) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| {
            let keep = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
            row[..keep].to_vec()
        })
        .collect();
    while out.last().is_some_and(|row| row.is_empty()) {
        out.pop();
    }
    out
}
