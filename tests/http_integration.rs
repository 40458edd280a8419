//! Integration tests for the HTTP surface.
//!
//! These tests go through `app_router` exactly as the server binary does:
//! 1. A registration submitted over HTTP settles through a Stripe event
//! 2. The same Stripe event delivered twice is acknowledged, not reapplied
//! 3. Checkout calls from foreign browser origins are refused

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use eventi_gare::adapters::{
    app_router, HttpSettings, InMemoryEventBus, InMemoryEventCatalog, InMemorySnapshotRepository,
    MockCheckoutGateway, PaymentsAppState, SequenceNumberAssigner, SponsorSettings,
};
use eventi_gare::application::{PaymentLedger, RedirectPolicy};
use eventi_gare::domain::foundation::{Currency, EventId, Money, OrganizerId};
use eventi_gare::domain::ledger::LedgerSnapshot;
use eventi_gare::domain::registration::RegistrationPricing;
use eventi_gare::ports::{EventInfo, SystemClock};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn upcoming_event() -> EventInfo {
    EventInfo {
        id: EventId::new(),
        organizer_id: OrganizerId::new(),
        name: "Granfondo delle Valli".to_string(),
        event_date: NaiveDate::from_ymd_opt(2099, 9, 14).unwrap(),
        fee_amount: Money::new(dec!(40)),
        accepts_cash: true,
        cash_deadline: None,
        assign_numbers: true,
        payout_account_id: None,
    }
}

fn app(event: EventInfo) -> Router {
    let catalog = Arc::new(InMemoryEventCatalog::with_events(vec![event]));
    let ledger = Arc::new(PaymentLedger::new(
        LedgerSnapshot::default(),
        Arc::new(InMemorySnapshotRepository::new()),
        Arc::new(InMemoryEventBus::new()),
        Arc::new(SystemClock),
    ));
    let state = PaymentsAppState {
        ledger,
        catalog: catalog.clone(),
        numbers: Arc::new(SequenceNumberAssigner::new(catalog)),
        gateway: Arc::new(MockCheckoutGateway::new()),
        redirects: RedirectPolicy::new(
            "https://eventigare.app/participant/payment/success",
            "https://eventigare.app/participant/payment/cancel",
            vec!["http://localhost:19006".to_string()],
        ),
        sponsor_redirects: RedirectPolicy::new(
            "https://eventigare.app/sponsor/success",
            "https://eventigare.app/sponsor/cancel",
            Vec::new(),
        ),
        pricing: RegistrationPricing::default(),
        sponsor: SponsorSettings {
            activation_amount: None,
            currency: Currency::Eur,
        },
    };
    app_router(
        state,
        &HttpSettings {
            cors_origins: Vec::new(),
            request_timeout: Duration::from_secs(10),
        },
    )
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn submit(app: &Router, event: &EventInfo, email: &str) -> Value {
    let (status, body) = send(
        app,
        post_json(
            "/registrations",
            json!({
                "eventId": event.id,
                "fullName": "Marco Rossi",
                "email": email,
                "phone": "+39 347 7654321",
                "city": "Trento",
                "privacyConsent": true,
                "retentionConsent": true,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn stripe_succeeded(event_id: &str, payment_intent_id: &str) -> Value {
    json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "created": 1_900_000_000,
        "data": {
            "object": {
                "id": "pi_3PabcXYZ",
                "latest_charge": "ch_3PabcXYZ",
                "metadata": {
                    "kind": "registration_payment",
                    "payment_intent_id": payment_intent_id,
                }
            }
        }
    })
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn registration_settles_through_stripe_event() {
    let event = upcoming_event();
    let app = app(event.clone());

    let submitted = submit(&app, &event, "marco@example.it").await;
    let registration_id = submitted["registration"]["id"].as_str().unwrap().to_string();
    let intent_id = submitted["paymentIntent"]["id"].as_str().unwrap().to_string();
    assert_eq!(submitted["registration"]["registrationStatus"], "pending_payment");

    let (status, body) = send(
        &app,
        post_json(
            "/checkout/participant",
            json!({ "registrationId": registration_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["state"], "checkout");

    let (status, body) = send(
        &app,
        post_json("/webhooks/stripe", stripe_succeeded("evt_1", &intent_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["applied"], true);
    assert_eq!(body["registrationStatus"], "paid");
    assert_eq!(body["assignedNumber"], 1);

    let (status, body) = send(
        &app,
        Request::get(format!("/registrations/{registration_id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registration"]["paymentStatus"], "captured");
    assert_eq!(body["registration"]["paymentReference"], "ch_3PabcXYZ");
}

#[tokio::test]
async fn redelivered_stripe_event_is_acknowledged_once() {
    let event = upcoming_event();
    let app = app(event.clone());
    let submitted = submit(&app, &event, "marco@example.it").await;
    let intent_id = submitted["paymentIntent"]["id"].as_str().unwrap().to_string();

    let first = send(
        &app,
        post_json("/webhooks/stripe", stripe_succeeded("evt_dup", &intent_id)),
    )
    .await;
    let second = send(
        &app,
        post_json("/webhooks/stripe", stripe_succeeded("evt_dup", &intent_id)),
    )
    .await;

    assert_eq!(first.1["applied"], true);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(second.1["applied"], false);
    assert_eq!(second.1["reason"], "already processed");
}

#[tokio::test]
async fn checkout_from_foreign_origin_is_refused() {
    let event = upcoming_event();
    let app = app(event.clone());
    let submitted = submit(&app, &event, "marco@example.it").await;
    let registration_id = submitted["registration"]["id"].as_str().unwrap();

    let mut request = post_json(
        "/checkout/participant",
        json!({ "registrationId": registration_id }),
    );
    request
        .headers_mut()
        .insert("origin", "https://phishing.example".parse().unwrap());
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "ORIGIN_NOT_ALLOWED");
}

#[tokio::test]
async fn cash_choice_is_reported_back() {
    let event = upcoming_event();
    let app = app(event.clone());
    let submitted = submit(&app, &event, "marco@example.it").await;
    let registration_id = submitted["registration"]["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        post_json(
            &format!("/registrations/{registration_id}/cash"),
            json!({}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["registration"]["registrationStatus"], "pending_cash");
    assert!(body["registration"]["paymentReference"]
        .as_str()
        .unwrap()
        .starts_with("CASH-"));
}
