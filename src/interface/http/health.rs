//! Health check endpoints.
//!
//! - `/` - Static service identity, no spreadsheet access
//! - `/healthz` - Opens the spreadsheet and checks the log worksheet

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use super::AppState;
use crate::strings::messages;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub ok: bool,
    pub service: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET / (and HEAD /)
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        ok: true,
        service: messages::SERVICE_NAME,
    })
}

/// GET /healthz
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    match state.processor.health().await {
        Ok(title) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                sheet: Some(title),
                tab: Some(state.processor.worksheet().to_string()),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    ok: false,
                    sheet: None,
                    tab: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}
