//! # Configuration
//!
//! Manages the loading and parsing of the service configuration file (`config.yaml`)
//! and the environment variables that override it at deploy time.
//! Every section is optional so an env-only deployment works without a file.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::strings::logs;

pub const DEFAULT_CONFIG_PATH: &str = "data/config.yaml";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub roster: Option<RosterConfig>,
    #[serde(default)]
    pub keywords: KeywordsConfig,
    #[serde(default)]
    pub replies: RepliesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Externally visible base URL (scheme and host, no path), used to rebuild
    /// the signed webhook URL.
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

/// Spreadsheet location and credentials.
#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    /// Raw id or full spreadsheet URL.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Spreadsheet title, used only when no id is set.
    #[serde(default)]
    pub sheet_name: Option<String>,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    #[serde(default = "default_true")]
    pub repair_header: bool,
    #[serde(default)]
    pub credentials_json: Option<String>,
    #[serde(default)]
    pub credentials_file: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Keep everything in memory instead of talking to the spreadsheet API.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            sheet_name: None,
            worksheet: default_worksheet(),
            repair_header: true,
            credentials_json: None,
            credentials_file: None,
            timeout_secs: default_timeout(),
            dry_run: false,
        }
    }
}

fn default_worksheet() -> String {
    "OPT-OUT LOGS".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

/// Contact roster that gets its status column flipped on opt-out.
#[derive(Debug, Deserialize, Clone)]
pub struct RosterConfig {
    pub worksheet: String,
    #[serde(default = "default_phone_column")]
    pub phone_column: String,
    #[serde(default = "default_status_column")]
    pub status_column: String,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_opted_out_value")]
    pub opted_out_value: String,
    #[serde(default = "default_opted_in_value")]
    pub opted_in_value: String,
    #[serde(default = "default_suffix_digits")]
    pub suffix_digits: usize,
    #[serde(default)]
    pub reactivate_on_opt_in: bool,
}

fn default_phone_column() -> String {
    "phone".to_string()
}
fn default_status_column() -> String {
    "status".to_string()
}
fn default_timestamp_column() -> String {
    "opt_out_at".to_string()
}
fn default_opted_out_value() -> String {
    "Opted-Out".to_string()
}
fn default_opted_in_value() -> String {
    "Active".to_string()
}
fn default_suffix_digits() -> usize {
    10
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The whole message must be the keyword.
    #[default]
    Exact,
    /// The keyword may appear as a word anywhere in the message.
    Contains,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordsConfig {
    #[serde(default = "default_opt_out_keywords")]
    pub opt_out: Vec<String>,
    #[serde(default = "default_opt_in_keywords")]
    pub opt_in: Vec<String>,
    #[serde(default = "default_help_keywords")]
    pub help: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            opt_out: default_opt_out_keywords(),
            opt_in: default_opt_in_keywords(),
            help: default_help_keywords(),
            match_mode: MatchMode::default(),
        }
    }
}

fn default_opt_out_keywords() -> Vec<String> {
    ["stop", "baja", "unsubscribe", "cancelar", "salir"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_opt_in_keywords() -> Vec<String> {
    vec!["start".to_string()]
}

fn default_help_keywords() -> Vec<String> {
    vec!["help".to_string(), "ayuda".to_string()]
}

/// Reply bodies sent back through the provider.
#[derive(Debug, Deserialize, Clone)]
pub struct RepliesConfig {
    #[serde(default = "default_reply_opt_out")]
    pub opt_out: String,
    #[serde(default = "default_reply_opt_in")]
    pub opt_in: String,
    #[serde(default = "default_reply_help")]
    pub help: String,
    #[serde(default = "default_reply_message")]
    pub message: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            opt_out: default_reply_opt_out(),
            opt_in: default_reply_opt_in(),
            help: default_reply_help(),
            message: default_reply_message(),
        }
    }
}

fn default_reply_opt_out() -> String {
    crate::strings::messages::OPT_OUT_REPLY.to_string()
}
fn default_reply_opt_in() -> String {
    crate::strings::messages::OPT_IN_REPLY.to_string()
}
fn default_reply_help() -> String {
    crate::strings::messages::HELP_REPLY.to_string()
}
fn default_reply_message() -> String {
    crate::strings::messages::MESSAGE_REPLY.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Sleep between attempts; one final attempt follows the last delay.
    #[serde(default = "default_delays")]
    pub delays_ms: Vec<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_delays(),
        }
    }
}

fn default_delays() -> Vec<u64> {
    vec![300, 600, 1200, 2500]
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct TwilioConfig {
    /// When set, every webhook must carry a valid `X-Twilio-Signature`.
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: Option<String>,
    /// Directory for the daily rolling log file. Console only when unset.
    #[serde(default)]
    pub dir: Option<String>,
}

impl AppConfig {
    /// Reads the YAML file when it exists. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("{}", logs::config_missing(&path.display().to_string()));
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Applies deploy-time overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(v);
        }
        if let Some(v) = get("SHEET_NAME") {
            self.sheets.sheet_name = Some(v);
        }
        if let Some(v) = get("WORKSHEET_NAME") {
            self.sheets.worksheet = v;
        }
        if let Some(v) = get("GOOGLE_CREDS_JSON") {
            self.sheets.credentials_json = Some(v);
        }
        if let Some(v) = get("GOOGLE_CREDS_FILE") {
            self.sheets.credentials_file = Some(v);
        }
        if let Some(v) = get("TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = Some(v);
        }
        if let Some(v) = get("PUBLIC_URL") {
            self.server.public_url = Some(v);
        }
        if let Some(v) = get("BIND_ADDR") {
            self.server.bind = v;
        } else if let Some(port) = get("PORT") {
            self.server.bind = format!("0.0.0.0:{port}");
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = Some(v);
        }
    }

    /// Startup checks that would otherwise surface on the first webhook.
    pub fn validate(&self) -> Result<()> {
        if self.sheets.worksheet.trim().is_empty() {
            bail!("Worksheet name must not be empty");
        }
        if let Some(roster) = &self.roster {
            if roster.worksheet.trim().is_empty() {
                bail!("Roster worksheet name must not be empty");
            }
            if roster.worksheet == self.sheets.worksheet {
                bail!("Roster and log must live in different worksheets");
            }
            if roster.suffix_digits == 0 {
                bail!("roster.suffix_digits must be at least 1");
            }
        }
        if self.sheets.dry_run {
            return Ok(());
        }
        if self.sheets.credentials_json.is_none() && self.sheets.credentials_file.is_none() {
            bail!("Missing GOOGLE_CREDS_JSON (or GOOGLE_CREDS_FILE)");
        }
        if self.sheets.spreadsheet_id.is_none() && self.sheets.sheet_name.is_none() {
            bail!("Set SPREADSHEET_ID or SHEET_NAME");
        }
        if self.twilio.auth_token.is_some() && self.server.public_url.is_none() {
            bail!("TWILIO_AUTH_TOKEN requires PUBLIC_URL to verify signatures");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/config.yaml")).unwrap();
        assert_eq!(config.sheets.worksheet, "OPT-OUT LOGS");
        assert_eq!(config.retry.delays_ms, vec![300, 600, 1200, 2500]);
        assert_eq!(config.keywords.match_mode, MatchMode::Exact);
        assert!(config.roster.is_none());
    }

    #[test]
    fn test_parse_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
sheets:
  spreadsheet_id: "abc"
  worksheet: "LOGS"
roster:
  worksheet: "Contacts"
  phone_column: "Telefono"
keywords:
  opt_out: ["stop"]
  match_mode: contains
retry:
  delays_ms: [10]
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.sheets.spreadsheet_id.as_deref(), Some("abc"));
        assert_eq!(config.sheets.worksheet, "LOGS");
        let roster = config.roster.unwrap();
        assert_eq!(roster.phone_column, "Telefono");
        assert_eq!(roster.status_column, "status");
        assert_eq!(roster.suffix_digits, 10);
        assert_eq!(config.keywords.opt_out, vec!["stop"]);
        assert_eq!(config.keywords.opt_in, vec!["start"]);
        assert_eq!(config.keywords.match_mode, MatchMode::Contains);
        assert_eq!(config.retry.delays_ms, vec![10]);
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sheets: [not, a, map").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("SPREADSHEET_ID", "  sheet-id  "),
            ("WORKSHEET_NAME", ""),
            ("PORT", "9000"),
            ("LOG_LEVEL", "debug"),
        ]));
        assert_eq!(config.sheets.spreadsheet_id.as_deref(), Some("sheet-id"));
        // Blank values keep the default
        assert_eq!(config.sheets.worksheet, "OPT-OUT LOGS");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_bind_addr_wins_over_port() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("BIND_ADDR", "127.0.0.1:1234"), ("PORT", "9000")]));
        assert_eq!(config.server.bind, "127.0.0.1:1234");
    }

    #[test]
    fn test_validate() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.sheets.dry_run = true;
        assert!(config.validate().is_ok());

        config.sheets.dry_run = false;
        config.sheets.credentials_json = Some("{}".to_string());
        config.sheets.sheet_name = Some("Opt-outs".to_string());
        assert!(config.validate().is_ok());

        config.twilio.auth_token = Some("token".to_string());
        assert!(config.validate().is_err());
        config.server.public_url = Some("https://example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roster_must_not_share_log_worksheet() {
        let mut config = AppConfig::default();
        config.sheets.dry_run = true;
        config.roster = Some(RosterConfig {
            worksheet: "OPT-OUT LOGS".to_string(),
            phone_column: default_phone_column(),
            status_column: default_status_column(),
            timestamp_column: default_timestamp_column(),
            opted_out_value: default_opted_out_value(),
            opted_in_value: default_opted_in_value(),
            suffix_digits: 10,
            reactivate_on_opt_in: false,
        });
        assert!(config.validate().is_err());
    }
}
