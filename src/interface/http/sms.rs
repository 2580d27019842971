//! Inbound SMS webhook.
//!
//! The provider posts `application/x-www-form-urlencoded` with `From`, `To`
//! and `Body`, and expects reply markup back. Any spreadsheet trouble is
//! handled inside the processor; this handler always answers with valid markup
//! unless the request itself is malformed or unsigned.

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::collections::BTreeMap;

use super::AppState;
use super::signature::SIGNATURE_HEADER;
use super::twiml;
use crate::domain::types::InboundSms;
use crate::strings::messages;

/// POST /sms/optout
pub async fn sms_optout(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    Form(params): Form<BTreeMap<String, String>>,
) -> Response {
    if let Some(verifier) = &state.verifier {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or_else(|| uri.path());
        if !verifier.verify(path, &params, signature) {
            tracing::warn!("Rejected webhook with invalid signature");
            return (StatusCode::FORBIDDEN, messages::INVALID_SIGNATURE).into_response();
        }
    }

    let Some(from) = params.get("From") else {
        return (StatusCode::UNPROCESSABLE_ENTITY, messages::MISSING_FROM).into_response();
    };
    let field = |name: &str| -> String { params.get(name).cloned().unwrap_or_default() };
    let sms = InboundSms::new(from, &field("To"), &field("Body"));

    let outcome = state.processor.handle(&sms, Utc::now()).await;
    if let Some(classification) = &outcome.classification {
        tracing::info!(
            action = %classification.action,
            status = %outcome.status,
            logged = outcome.logged,
            "Processed inbound SMS"
        );
    }

    (
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        twiml::render(outcome.reply.as_deref()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::processor::InboundProcessor;
    use crate::domain::config::AppConfig;
    use crate::domain::error::SheetError;
    use crate::infrastructure::sheets::memory::MemorySheets;
    use crate::interface::http::router;
    use crate::interface::http::signature::SignatureVerifier;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    const LOG: &str = "OPT-OUT LOGS";

    fn app_with(config: AppConfig, store: Arc<MemorySheets>) -> axum::Router {
        let processor = Arc::new(InboundProcessor::new(&config, store));
        router(AppState::new(&config, processor))
    }

    fn app(store: Arc<MemorySheets>) -> axum::Router {
        let mut config = AppConfig::default();
        config.retry.delays_ms = vec![1];
        app_with(config, store)
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_stop_replies_and_logs() {
        let store = Arc::new(MemorySheets::new("Citrino"));
        let response = app(store.clone())
            .oneshot(form_request(
                "/sms/optout",
                "From=%2B15550101111&To=%2B15559990000&Body=STOP",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
        let body = body_text(response).await;
        assert!(body.contains("<Message>Has sido dado de baja"));

        let rows = store.rows(LOG);
        assert_eq!(rows[1][1], "+15550101111");
        assert_eq!(rows[1][2], "STOP");
        assert_eq!(rows[1][5], "Opt-out");
    }

    #[tokio::test]
    async fn test_noise_gets_empty_response() {
        let store = Arc::new(MemorySheets::new("Citrino"));
        let response = app(store.clone())
            .oneshot(form_request("/sms/optout", "From=%2B15550101111&Body="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<Response></Response>");
        assert!(!store.has_worksheet(LOG));
    }

    #[tokio::test]
    async fn test_missing_from() {
        let store = Arc::new(MemorySheets::new("Citrino"));
        let response = app(store)
            .oneshot(form_request("/sms/optout", "Body=hola"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_sheet_outage_still_replies() {
        let store = Arc::new(MemorySheets::new("Citrino"));
        store.fail_next("ensure_worksheet", SheetError::http("ensure_worksheet", 500, "down"), 10);
        let response = app(store)
            .oneshot(form_request("/sms/optout", "From=%2B15550101111&Body=hola"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Recibido. Gracias."));
    }

    #[tokio::test]
    async fn test_signature_required_when_configured() {
        let mut config = AppConfig::default();
        config.twilio.auth_token = Some("secret".to_string());
        config.server.public_url = Some("https://hooks.example.com".to_string());

        let store = Arc::new(MemorySheets::new("Citrino"));
        let unsigned = app_with(config.clone(), store.clone())
            .oneshot(form_request("/sms/optout", "From=%2B15550101111&Body=STOP"))
            .await
            .unwrap();
        assert_eq!(unsigned.status(), StatusCode::FORBIDDEN);
        assert!(!store.has_worksheet(LOG));

        let params: BTreeMap<String, String> = [("Body", "STOP"), ("From", "+15550101111")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let verifier = SignatureVerifier::new("secret", "https://hooks.example.com");
        let signature = verifier.sign("https://hooks.example.com/sms/optout", &params);

        let mut request = form_request("/sms/optout", "From=%2B15550101111&Body=STOP");
        request
            .headers_mut()
            .insert(SIGNATURE_HEADER, signature.parse().unwrap());
        let signed = app_with(config, store.clone()).oneshot(request).await.unwrap();
        assert_eq!(signed.status(), StatusCode::OK);
        assert!(store.has_worksheet(LOG));
    }

    #[tokio::test]
    async fn test_root_and_head() {
        let store = Arc::new(MemorySheets::new("Citrino"));
        let response = app(store.clone())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["service"], "citrino-optout-webhook");

        let head = app(store)
            .oneshot(Request::builder().method(Method::HEAD).uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(head.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_healthz() {
        let store = Arc::new(MemorySheets::new("Citrino"));
        let response = app(store.clone())
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["sheet"], "Citrino");
        assert_eq!(json["tab"], "OPT-OUT LOGS");

        store.fail_next("title", SheetError::http("title", 403, "forbidden"), 1);
        let response = app(store)
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().contains("forbidden"));
    }
}
