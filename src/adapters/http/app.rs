//! Top-level router: payment routes, health probe and tower-http layers.

use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::payments::{payments_router, PaymentsAppState};

/// Layer settings taken from the server configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpSettings {
    pub cors_origins: Vec<String>,
    pub request_timeout: Duration,
}

/// `GET /health` - liveness probe
async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Builds the served application.
pub fn app_router(state: PaymentsAppState, settings: &HttpSettings) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .merge(payments_router())
        .with_state(state)
        .layer(cors_layer(&settings.cors_origins))
        .layer(TraceLayer::new_for_http());
    if !settings.request_timeout.is_zero() {
        router = router.layer(TimeoutLayer::new(settings.request_timeout));
    }
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::adapters::http::payments::SponsorSettings;
    use crate::application::handlers::test_support::{fixture, redirects};
    use crate::domain::foundation::Currency;
    use crate::domain::registration::RegistrationPricing;

    fn state() -> PaymentsAppState {
        let f = fixture(vec![]);
        PaymentsAppState {
            ledger: f.ledger.clone(),
            catalog: f.catalog.clone(),
            numbers: f.numbers.clone(),
            gateway: Arc::new(f.gateway.clone()),
            redirects: redirects(),
            sponsor_redirects: redirects(),
            pricing: RegistrationPricing::default(),
            sponsor: SponsorSettings {
                activation_amount: None,
                currency: Currency::Eur,
            },
        }
    }

    #[tokio::test]
    async fn health_probe_answers_ok() {
        let app = app_router(
            state(),
            &HttpSettings {
                cors_origins: vec!["https://eventigare.app".to_string()],
                request_timeout: Duration::from_secs(5),
            },
        );
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn payment_routes_are_mounted() {
        let app = app_router(state(), &HttpSettings::default());
        let response = app
            .oneshot(
                Request::get("/registrations/00000000-0000-0000-0000-000000000000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
