//! # Spreadsheet Backends
//!
//! Implementations of `SheetStore`: the Google Sheets REST client and an
//! in-memory store for dry runs and tests.

pub mod a1;
pub mod auth;
pub mod google;
pub mod memory;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::domain::config::SheetsConfig;
use crate::domain::traits::SheetStore;
use auth::{ServiceAccountAuth, ServiceAccountKey};
use google::{GoogleSheets, SpreadsheetTarget};
use memory::MemorySheets;

/// Builds the store described by the configuration.
pub fn connect(config: &SheetsConfig) -> Result<Arc<dyn SheetStore>> {
    if config.dry_run {
        let store = MemorySheets::new("dry-run");
        return Ok(Arc::new(store));
    }

    let key = match (&config.credentials_json, &config.credentials_file) {
        (Some(raw), _) => ServiceAccountKey::from_json(raw),
        (None, Some(path)) => ServiceAccountKey::from_file(path),
        (None, None) => anyhow::bail!("Missing GOOGLE_CREDS_JSON"),
    }
    .context("Google auth failed")?;

    let target = match (&config.spreadsheet_id, &config.sheet_name) {
        (Some(id), _) => SpreadsheetTarget::Id(id.clone()),
        (None, Some(name)) => SpreadsheetTarget::Name(name.clone()),
        (None, None) => anyhow::bail!("Set SPREADSHEET_ID or SHEET_NAME"),
    };

    let http = GoogleSheets::http_client(config.timeout_secs)?;
    let auth = ServiceAccountAuth::new(key, http.clone());
    tracing::info!("Using service account {}", auth.client_email());

    let store = GoogleSheets::new(target, auth, http)?;
    Ok(Arc::new(store))
}
