//! Google Sheets v4 REST client.
//!
//! Implements `SheetStore` on top of the values and batchUpdate endpoints.
//! The spreadsheet is addressed by id, or looked up once by title through Drive.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

use super::a1;
use super::auth::ServiceAccountAuth;
use crate::domain::error::SheetError;
use crate::domain::traits::SheetStore;
use crate::strings::logs;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
const DRIVE_BASE_URL: &str = "https://www.googleapis.com";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// How the spreadsheet was named in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpreadsheetTarget {
    Id(String),
    Name(String),
}

fn sheet_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{40,}$").expect("valid regex"))
}

/// Accepts a bare id or a full spreadsheet URL and returns the id.
pub fn normalize_sheet_id(raw: &str) -> Result<String, SheetError> {
    let mut id = raw.trim();
    if id.is_empty() {
        return Err(SheetError::new("config", "Missing SPREADSHEET_ID"));
    }
    if let Some((_, rest)) = id.split_once("/d/") {
        id = rest.split('/').next().unwrap_or(rest);
    }
    if !sheet_id_pattern().is_match(id) {
        return Err(SheetError::new(
            "config",
            "Invalid SPREADSHEET_ID (check O/0 and l/I)",
        ));
    }
    Ok(id.to_string())
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    properties: Option<SpreadsheetProperties>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DriveFiles {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_values(body: Value) -> Result<Vec<Vec<String>>, SheetError> {
    let range: ValueRange = serde_json::from_value(body)
        .map_err(|e| SheetError::new("read_range", format!("Unexpected values payload: {e}")))?;
    Ok(range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect())
}

/// Extracts the most useful error text from a Google API error body.
fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| text.to_string())
}

fn drive_query(name: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        name.replace('\\', "\\\\").replace('\'', "\\'"),
        SPREADSHEET_MIME
    )
}

pub struct GoogleSheets {
    http: Client,
    auth: ServiceAccountAuth,
    target: SpreadsheetTarget,
    spreadsheet_id: OnceCell<String>,
    sheet_ids: Mutex<HashMap<String, i64>>,
    sheets_url: String,
    drive_url: String,
}

impl GoogleSheets {
    pub fn new(target: SpreadsheetTarget, auth: ServiceAccountAuth, http: Client) -> Result<Self, SheetError> {
        // Validate eagerly so a typo in the id fails at startup.
        if let SpreadsheetTarget::Id(raw) = &target {
            normalize_sheet_id(raw)?;
        }
        Ok(Self {
            http,
            auth,
            target,
            spreadsheet_id: OnceCell::new(),
            sheet_ids: Mutex::new(HashMap::new()),
            sheets_url: SHEETS_BASE_URL.to_string(),
            drive_url: DRIVE_BASE_URL.to_string(),
        })
    }

    /// HTTP client shared by the auth flow and the API calls.
    pub fn http_client(timeout_secs: u64) -> Result<Client, SheetError> {
        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SheetError::new("http", format!("Failed to create HTTP client: {e}")))
    }

    async fn call(&self, op: &str, method: Method, url: &str, body: Option<Value>) -> Result<Value, SheetError> {
        let token = self.auth.token().await?;
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SheetError::transport(op, format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                self.auth.invalidate().await;
            }
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(SheetError::http(op, status.as_u16(), error_message(&text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SheetError::transport(op, format!("Failed to read response: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| SheetError::new(op, format!("Failed to parse response: {e}")))
    }

    async fn spreadsheet_id(&self) -> Result<&str, SheetError> {
        let id = self
            .spreadsheet_id
            .get_or_try_init(|| async {
                match &self.target {
                    SpreadsheetTarget::Id(raw) => normalize_sheet_id(raw),
                    SpreadsheetTarget::Name(name) => self.find_by_name(name).await,
                }
            })
            .await?;
        Ok(id.as_str())
    }

    async fn find_by_name(&self, name: &str) -> Result<String, SheetError> {
        let op = "open_by_name";
        let url = format!(
            "{}/drive/v3/files?q={}&fields=files(id)&pageSize=1&supportsAllDrives=true&includeItemsFromAllDrives=true",
            self.drive_url,
            urlencoding::encode(&drive_query(name))
        );
        let body = self.call(op, Method::GET, &url, None).await?;
        let files: DriveFiles = serde_json::from_value(body)
            .map_err(|e| SheetError::new(op, format!("Unexpected Drive payload: {e}")))?;
        let id = files
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetError::new(op, format!("Spreadsheet '{name}' not found")))?;
        tracing::info!("{}", logs::spreadsheet_resolved(name, &id));
        Ok(id)
    }

    async fn metadata(&self) -> Result<SpreadsheetMeta, SheetError> {
        let op = "metadata";
        let id = self.spreadsheet_id().await?;
        let url = format!(
            "{}/v4/spreadsheets/{}?fields={}",
            self.sheets_url,
            id,
            urlencoding::encode("properties.title,sheets.properties(sheetId,title)")
        );
        let body = self.call(op, Method::GET, &url, None).await?;
        let meta: SpreadsheetMeta = serde_json::from_value(body)
            .map_err(|e| SheetError::new(op, format!("Unexpected metadata payload: {e}")))?;

        let mut ids = self.sheet_ids.lock().await;
        for sheet in &meta.sheets {
            ids.insert(sheet.properties.title.clone(), sheet.properties.sheet_id);
        }
        Ok(meta)
    }

    async fn sheet_id(&self, op: &str, worksheet: &str) -> Result<i64, SheetError> {
        if let Some(id) = self.sheet_ids.lock().await.get(worksheet) {
            return Ok(*id);
        }
        self.metadata().await?;
        self.sheet_ids
            .lock()
            .await
            .get(worksheet)
            .copied()
            .ok_or_else(|| SheetError::new(op, format!("Worksheet '{worksheet}' not found")))
    }

    async fn batch_update(&self, op: &str, requests: Value) -> Result<Value, SheetError> {
        let id = self.spreadsheet_id().await?;
        let url = format!("{}/v4/spreadsheets/{}:batchUpdate", self.sheets_url, id);
        self.call(op, Method::POST, &url, Some(json!({ "requests": requests })))
            .await
    }

    async fn values_url(&self, range: &str, suffix: &str) -> Result<String, SheetError> {
        let id = self.spreadsheet_id().await?;
        Ok(format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.sheets_url,
            id,
            urlencoding::encode(range),
            suffix
        ))
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn title(&self) -> Result<String, SheetError> {
        let meta = self.metadata().await?;
        meta.properties
            .map(|p| p.title)
            .ok_or_else(|| SheetError::new("title", "Spreadsheet has no title"))
    }

    async fn ensure_worksheet(&self, worksheet: &str, rows: u32, cols: u32) -> Result<bool, SheetError> {
        let op = "ensure_worksheet";
        if self.sheet_ids.lock().await.contains_key(worksheet) {
            return Ok(false);
        }
        let meta = self.metadata().await?;
        if meta.sheets.iter().any(|s| s.properties.title == worksheet) {
            return Ok(false);
        }

        let reply = self
            .batch_update(
                op,
                json!([{
                    "addSheet": {
                        "properties": {
                            "title": worksheet,
                            "gridProperties": { "rowCount": rows, "columnCount": cols }
                        }
                    }
                }]),
            )
            .await?;

        if let Some(sheet_id) = reply
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(Value::as_i64)
        {
            self.sheet_ids.lock().await.insert(worksheet.to_string(), sheet_id);
        }
        Ok(true)
    }

    async fn read_range(&self, worksheet: &str, range: Option<&str>) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.values_url(&a1::qualified(worksheet, range), "").await?;
        let body = self.call("read_range", Method::GET, &url, None).await?;
        parse_values(body)
    }

    async fn write_range(&self, worksheet: &str, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError> {
        let qualified = a1::qualified(worksheet, Some(range));
        let url = self.values_url(&qualified, "?valueInputOption=RAW").await?;
        let body = json!({ "range": qualified, "majorDimension": "ROWS", "values": rows });
        self.call("write_range", Method::PUT, &url, Some(body)).await?;
        Ok(())
    }

    async fn append_row(&self, worksheet: &str, row: Vec<String>) -> Result<(), SheetError> {
        let qualified = a1::qualified(worksheet, Some("A1"));
        let url = self
            .values_url(&qualified, ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS")
            .await?;
        let body = json!({ "majorDimension": "ROWS", "values": [row] });
        self.call("append_row", Method::POST, &url, Some(body)).await?;
        Ok(())
    }

    async fn clear(&self, worksheet: &str) -> Result<(), SheetError> {
        let url = self.values_url(&a1::qualified(worksheet, None), ":clear").await?;
        self.call("clear", Method::POST, &url, Some(json!({}))).await?;
        Ok(())
    }

    async fn freeze_rows(&self, worksheet: &str, rows: u32) -> Result<(), SheetError> {
        let op = "freeze_rows";
        let sheet_id = self.sheet_id(op, worksheet).await?;
        self.batch_update(
            op,
            json!([{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": sheet_id,
                        "gridProperties": { "frozenRowCount": rows }
                    },
                    "fields": "gridProperties.frozenRowCount"
                }
            }]),
        )
        .await?;
        Ok(())
    }
}
