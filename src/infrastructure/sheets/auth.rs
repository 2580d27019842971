//! Service-account authentication for the Google APIs.
//!
//! Implements the OAuth2 JWT-bearer grant: a claim set signed with the
//! account's RSA key is exchanged for a short-lived access token, which is
//! cached until shortly before it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::error::SheetError;
use crate::strings::logs;

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file that the grant needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, SheetError> {
        serde_json::from_str(raw)
            .map_err(|e| SheetError::new("auth", format!("Invalid service-account JSON: {e}")))
    }

    pub fn from_file(path: &str) -> Result<Self, SheetError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SheetError::new("auth", format!("Cannot read {path}: {e}")))?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey, http: Client) -> Self {
        Self {
            key,
            http,
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed JWT assertion for the token exchange.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, SheetError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES.join(" "),
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        // Keys pasted into env vars often carry literal "\n" sequences.
        let pem = self.key.private_key.replace("\\n", "\n");
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| SheetError::new("auth", format!("Invalid private key: {e}")))?;

        encode(&header, &claims, &encoding_key)
            .map_err(|e| SheetError::new("auth", format!("Failed to sign assertion: {e}")))
    }

    /// Returns a valid access token, refreshing it when needed.
    pub async fn token(&self) -> Result<String, SheetError> {
        let mut guard = self.cached.lock().await;
        let now = Utc::now();
        if let Some(cached) = guard.as_ref()
            && cached.is_fresh(now)
        {
            return Ok(cached.value.clone());
        }

        let fresh = self.fetch(now).await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    /// Drops the cached token, e.g. after a 401.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken, SheetError> {
        let op = "auth";
        let assertion = self.assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SheetError::transport(op, format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(SheetError::http(op, status.as_u16(), text));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SheetError::new(op, format!("Failed to parse token response: {e}")))?;

        tracing::debug!("{}", logs::token_refreshed(token.expires_in));

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in as i64),
        })
    }
}
