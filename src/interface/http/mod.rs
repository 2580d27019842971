//! # HTTP Interface
//!
//! Builds the axum router: the provider webhook, health checks, and the
//! service root used by the hosting platform's probes.

pub mod health;
pub mod signature;
pub mod sms;
pub mod twiml;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::processor::InboundProcessor;
use crate::domain::config::AppConfig;
use signature::SignatureVerifier;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<InboundProcessor>,
    pub verifier: Option<SignatureVerifier>,
}

impl AppState {
    pub fn new(config: &AppConfig, processor: Arc<InboundProcessor>) -> Self {
        let verifier = match (&config.twilio.auth_token, &config.server.public_url) {
            (Some(token), Some(url)) => Some(SignatureVerifier::new(token, url)),
            _ => None,
        };
        Self {
            processor,
            verifier,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // `get` also answers HEAD, which the platform's probes use.
        .route("/", get(health::root))
        .route("/healthz", get(health::healthz))
        .route("/sms/optout", post(sms::sms_optout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
