//! HTTP handlers for registration, checkout and webhook endpoints.
//!
//! These handlers connect Axum routes to the application command handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use tracing::{debug, warn};

use crate::adapters::stripe::{StripeEventRoute, StripeWebhookEvent};
use crate::application::{
    ApplyPaymentWebhookCommand, ApplyPaymentWebhookHandler, ApplyPaymentWebhookResult,
    ApplySponsorWebhookCommand, ApplySponsorWebhookHandler, ApplySponsorWebhookResult,
    CancelRegistrationCommand, CancelRegistrationHandler, ChooseCashPaymentCommand,
    ChooseCashPaymentHandler, Commit, ConfirmCashPaymentCommand, ConfirmCashPaymentHandler,
    ParticipantCheckoutCommand, ParticipantCheckoutHandler, ParticipantCheckoutResult,
    PaymentLedger, RedirectPolicy, SponsorModuleCheckoutCommand, SponsorModuleCheckoutHandler,
    SponsorModuleCheckoutResult, SponsorSlotCheckoutCommand, SponsorSlotCheckoutHandler,
    SubmitRegistrationCommand, SubmitRegistrationHandler,
};
use crate::domain::foundation::{Currency, Money, RegistrationId};
use crate::domain::registration::{
    EntityKind, PaymentError, PaymentWebhookPayload, RegistrationPricing,
};
use crate::domain::sponsor::SponsorWebhookPayload;
use crate::ports::{CheckoutGateway, EventCatalog, NumberAssigner};

use super::dto::{
    CashPaymentRequest, ErrorResponse, ParticipantCheckoutRequest, ParticipantCheckoutResponse,
    RegistrationPaymentView, RegistrationResponse, SponsorModuleCheckoutRequest,
    SponsorModuleCheckoutResponse, SponsorSlotCheckoutRequest, SponsorSlotCheckoutResponse,
    SubmitRegistrationRequest, WebhookResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Sponsor pricing shared by the sponsor checkouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SponsorSettings {
    /// Module activation price; the default applies when absent or not positive.
    pub activation_amount: Option<Money>,
    pub currency: Currency,
}

/// Shared state; handlers are built on demand from it.
#[derive(Clone)]
pub struct PaymentsAppState {
    pub ledger: Arc<PaymentLedger>,
    pub catalog: Arc<dyn EventCatalog>,
    pub numbers: Arc<dyn NumberAssigner>,
    pub gateway: Arc<dyn CheckoutGateway>,
    /// Redirects for participant checkouts.
    pub redirects: RedirectPolicy,
    /// Redirects for sponsor slot and module checkouts.
    pub sponsor_redirects: RedirectPolicy,
    pub pricing: RegistrationPricing,
    pub sponsor: SponsorSettings,
}

impl PaymentsAppState {
    pub fn submit_registration_handler(&self) -> SubmitRegistrationHandler {
        SubmitRegistrationHandler::new(
            self.ledger.clone(),
            self.catalog.clone(),
            self.numbers.clone(),
            self.pricing,
        )
    }

    pub fn choose_cash_handler(&self) -> ChooseCashPaymentHandler {
        ChooseCashPaymentHandler::new(
            self.ledger.clone(),
            self.catalog.clone(),
            self.pricing.currency,
        )
    }

    pub fn confirm_cash_handler(&self) -> ConfirmCashPaymentHandler {
        ConfirmCashPaymentHandler::new(self.ledger.clone(), self.numbers.clone())
    }

    pub fn cancel_handler(&self) -> CancelRegistrationHandler {
        CancelRegistrationHandler::new(self.ledger.clone())
    }

    pub fn payment_webhook_handler(&self) -> ApplyPaymentWebhookHandler {
        ApplyPaymentWebhookHandler::new(self.ledger.clone(), self.numbers.clone())
    }

    pub fn sponsor_webhook_handler(&self) -> ApplySponsorWebhookHandler {
        ApplySponsorWebhookHandler::new(self.ledger.clone())
    }

    pub fn participant_checkout_handler(&self) -> ParticipantCheckoutHandler {
        ParticipantCheckoutHandler::new(
            self.ledger.clone(),
            self.catalog.clone(),
            self.gateway.clone(),
            self.redirects.clone(),
            self.pricing.currency,
            self.pricing.session_minutes,
        )
    }

    pub fn sponsor_module_checkout_handler(&self) -> SponsorModuleCheckoutHandler {
        SponsorModuleCheckoutHandler::new(
            self.ledger.clone(),
            self.gateway.clone(),
            self.sponsor_redirects.clone(),
            self.sponsor.activation_amount,
            self.sponsor.currency,
        )
    }

    pub fn sponsor_slot_checkout_handler(&self) -> SponsorSlotCheckoutHandler {
        SponsorSlotCheckoutHandler::new(
            self.ledger.clone(),
            self.catalog.clone(),
            self.gateway.clone(),
            self.sponsor_redirects.clone(),
            self.sponsor.currency,
        )
    }
}

/// Browser calls must come from an allowed origin; calls without `Origin` pass.
fn check_origin(policy: &RedirectPolicy, headers: &HeaderMap) -> Result<(), PaymentsApiError> {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return Ok(());
    };
    let origin = origin.to_str().map_err(|_| PaymentsApiError::OriginNotAllowed)?;
    if policy.is_origin_allowed(origin) {
        Ok(())
    } else {
        warn!(origin, "Checkout origin rejected");
        Err(PaymentsApiError::OriginNotAllowed)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Registration Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /registrations - submit a free or paid registration
pub async fn submit_registration(
    State(state): State<PaymentsAppState>,
    Json(request): Json<SubmitRegistrationRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let cmd = SubmitRegistrationCommand {
        event_id: request.event_id,
        full_name: request.full_name,
        email: request.email,
        phone: request.phone,
        city: request.city,
        birth_date: request.birth_date,
        privacy_consent: request.privacy_consent,
        retention_consent: request.retention_consent,
    };

    let result = state.submit_registration_handler().handle(cmd).await?;

    let response = RegistrationResponse {
        registration: result.registration,
        payment_intent: result.payment_intent,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /registrations/:id - current registration and its linked intent
pub async fn get_registration(
    State(state): State<PaymentsAppState>,
    Path(registration_id): Path<RegistrationId>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    // Reading through a commit applies the expiry sweep first.
    let response = state
        .ledger
        .commit(|snapshot, _| {
            let registration = snapshot
                .registration(registration_id)
                .cloned()
                .ok_or_else(|| PaymentError::not_found(EntityKind::Registration, registration_id))?;
            let payment_intent = registration
                .payment_intent_id
                .and_then(|id| snapshot.payment_intent(id))
                .cloned();
            Ok(Commit::keep(RegistrationResponse {
                registration,
                payment_intent,
            }))
        })
        .await?;
    Ok(Json(response))
}

/// POST /registrations/:id/cash - switch to cash payment at the event
pub async fn choose_cash_payment(
    State(state): State<PaymentsAppState>,
    Path(registration_id): Path<RegistrationId>,
    body: Option<Json<CashPaymentRequest>>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let cmd = ChooseCashPaymentCommand {
        registration_id,
        reference: request.reference,
    };

    let result = state.choose_cash_handler().handle(cmd).await?;

    Ok(Json(RegistrationResponse {
        registration: result.registration,
        payment_intent: Some(result.intent),
    }))
}

/// POST /registrations/:id/cash/confirm - organizer confirms the cash was collected
pub async fn confirm_cash_payment(
    State(state): State<PaymentsAppState>,
    Path(registration_id): Path<RegistrationId>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let result = state
        .confirm_cash_handler()
        .handle(ConfirmCashPaymentCommand { registration_id })
        .await?;

    Ok(Json(RegistrationResponse {
        registration: result.registration,
        payment_intent: None,
    }))
}

/// POST /registrations/:id/cancel - cancel an unpaid registration
pub async fn cancel_registration(
    State(state): State<PaymentsAppState>,
    Path(registration_id): Path<RegistrationId>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let result = state
        .cancel_handler()
        .handle(CancelRegistrationCommand { registration_id })
        .await?;

    Ok(Json(RegistrationResponse {
        registration: result.registration,
        payment_intent: None,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /checkout/participant - hosted checkout for a registration
pub async fn participant_checkout(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    Json(request): Json<ParticipantCheckoutRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    check_origin(&state.redirects, &headers)?;

    let cmd = ParticipantCheckoutCommand {
        registration_id: request.registration_id,
        success_url: request.success_url,
        cancel_url: request.cancel_url,
    };

    let response = match state.participant_checkout_handler().handle(cmd).await? {
        ParticipantCheckoutResult::Checkout {
            checkout_url,
            registration,
            intent,
        } => ParticipantCheckoutResponse::Checkout {
            checkout_url,
            payment: RegistrationPaymentView::new(&registration, Some(&intent)),
        },
        ParticipantCheckoutResult::Final {
            registration,
            intent,
        } => ParticipantCheckoutResponse::Final {
            payment: RegistrationPaymentView::new(&registration, intent.as_ref()),
        },
    };
    Ok(Json(response))
}

/// POST /checkout/sponsor-module - unlock sponsor slots for an organizer
pub async fn sponsor_module_checkout(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    Json(request): Json<SponsorModuleCheckoutRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    check_origin(&state.sponsor_redirects, &headers)?;

    let organizer_id = request.organizer_id;
    let cmd = SponsorModuleCheckoutCommand {
        organizer_id,
        payer_email: request.payer_email,
        success_url: request.success_url,
        cancel_url: request.cancel_url,
    };

    let response = match state.sponsor_module_checkout_handler().handle(cmd).await? {
        SponsorModuleCheckoutResult::AlreadyActive => {
            SponsorModuleCheckoutResponse::AlreadyActive { organizer_id }
        }
        SponsorModuleCheckoutResult::Checkout {
            checkout_url,
            amount,
            currency,
        } => SponsorModuleCheckoutResponse::Checkout {
            checkout_url,
            organizer_id,
            amount,
            currency,
        },
    };
    Ok(Json(response))
}

/// POST /checkout/sponsor-slot - buy a sponsor slot on an event
pub async fn sponsor_slot_checkout(
    State(state): State<PaymentsAppState>,
    headers: HeaderMap,
    Json(request): Json<SponsorSlotCheckoutRequest>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    check_origin(&state.sponsor_redirects, &headers)?;

    let cmd = SponsorSlotCheckoutCommand {
        event_id: request.event_id,
        sponsor_name: request.sponsor_name,
        sponsor_name_it: request.sponsor_name_it,
        sponsor_name_en: request.sponsor_name_en,
        sponsor_url: request.sponsor_url,
        sponsor_logo_url: request.sponsor_logo_url,
        payer_email: request.payer_email,
        package_days: request.package_days,
        amount: request.amount,
        success_url: request.success_url,
        cancel_url: request.cancel_url,
    };

    let result = state.sponsor_slot_checkout_handler().handle(cmd).await?;

    Ok(Json(SponsorSlotCheckoutResponse {
        state: "checkout",
        checkout_url: result.checkout_url,
        sponsor_slot: result.slot,
        max_package_days: result.max_package_days,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payments - normalized registration payment webhook
pub async fn payment_webhook(
    State(state): State<PaymentsAppState>,
    Json(payload): Json<PaymentWebhookPayload>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    Ok(Json(apply_payment(&state, payload).await?))
}

/// POST /webhooks/sponsors - normalized sponsor webhook
pub async fn sponsor_webhook(
    State(state): State<PaymentsAppState>,
    Json(payload): Json<SponsorWebhookPayload>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    Ok(Json(apply_sponsor(&state, payload).await?))
}

/// POST /webhooks/stripe - raw Stripe event, already verified upstream
pub async fn stripe_webhook(
    State(state): State<PaymentsAppState>,
    Json(event): Json<StripeWebhookEvent>,
) -> Result<impl IntoResponse, PaymentsApiError> {
    let route = event
        .route()
        .map_err(|e| PaymentsApiError::InvalidPayload(e.to_string()))?;

    let response = match route {
        StripeEventRoute::Ignored => {
            debug!(event_id = %event.id, event_type = %event.event_type, "Stripe event ignored");
            WebhookResponse::ignored(format!("unsupported event {}", event.event_type))
        }
        StripeEventRoute::Sponsor(payload) => apply_sponsor(&state, payload).await?,
        StripeEventRoute::Registration(routed) => {
            let payment_intent_id = match routed.payment_intent_id.clone() {
                Some(id) => id,
                None => {
                    let provider_id = routed.provider_payment_intent_id.clone();
                    let snapshot = state.ledger.current()?;
                    snapshot
                        .find_intent_by_provider_id(&provider_id)
                        .map(|intent| intent.id.to_string())
                        .ok_or_else(|| {
                            PaymentError::not_found(EntityKind::PaymentIntent, provider_id)
                        })?
                }
            };
            apply_payment(&state, routed.into_payload(payment_intent_id)).await?
        }
    };
    Ok(Json(response))
}

async fn apply_payment(
    state: &PaymentsAppState,
    payload: PaymentWebhookPayload,
) -> Result<WebhookResponse, PaymentError> {
    let result = state
        .payment_webhook_handler()
        .handle(ApplyPaymentWebhookCommand { payload })
        .await?;
    Ok(match result {
        ApplyPaymentWebhookResult::Applied { registration, .. } => {
            WebhookResponse::registration(&registration)
        }
        ApplyPaymentWebhookResult::AlreadyProcessed => WebhookResponse::already_processed(),
    })
}

async fn apply_sponsor(
    state: &PaymentsAppState,
    payload: SponsorWebhookPayload,
) -> Result<WebhookResponse, PaymentError> {
    let result = state
        .sponsor_webhook_handler()
        .handle(ApplySponsorWebhookCommand { payload })
        .await?;
    Ok(match result {
        ApplySponsorWebhookResult::Applied(change) => WebhookResponse::sponsor(&change),
        ApplySponsorWebhookResult::AlreadyProcessed => WebhookResponse::already_processed(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts payment errors to HTTP responses.
#[derive(Debug)]
pub enum PaymentsApiError {
    Payment(PaymentError),
    OriginNotAllowed,
    InvalidPayload(String),
}

impl From<PaymentError> for PaymentsApiError {
    fn from(err: PaymentError) -> Self {
        PaymentsApiError::Payment(err)
    }
}

impl IntoResponse for PaymentsApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            PaymentsApiError::Payment(PaymentError::DuplicateWebhook(_)) => {
                (StatusCode::OK, Json(WebhookResponse::already_processed())).into_response()
            }
            PaymentsApiError::Payment(err) => {
                let status = err.status_code();
                if status.is_server_error() {
                    warn!(error = %err, "Request failed");
                }
                let mut body = ErrorResponse::new(err.code().to_string(), err.to_string())
                    .retryable(err.is_retryable());
                if let PaymentError::PackageExceedsEventLifetime {
                    max_package_days, ..
                } = err
                {
                    body = body.with_details(serde_json::json!({ "maxPackageDays": max_package_days }));
                }
                (status, Json(body)).into_response()
            }
            PaymentsApiError::OriginNotAllowed => (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("ORIGIN_NOT_ALLOWED", "Origin not allowed")),
            )
                .into_response(),
            PaymentsApiError::InvalidPayload(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("INVALID_PAYLOAD", message)),
            )
                .into_response(),
        }
    }
}
