//! Stripe checkout gateway.
//!
//! Opens hosted Checkout Sessions in `payment` mode, one line item each.
//! When the organizer has a connected account the platform commission is
//! taken as an application fee and the rest is transferred to them.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(secret_key);
//! let gateway = StripeCheckoutGateway::new(config);
//! ```

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::domain::foundation::Timestamp;
use crate::ports::{CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode};

use super::webhook_types::{StripeCheckoutSession, StripeErrorBody};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// `CheckoutGateway` backed by the Stripe REST API.
pub struct StripeCheckoutGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeCheckoutGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Form-encoded parameters for `POST /v1/checkout/sessions`.
    pub(crate) fn form_params(
        request: &CheckoutRequest,
    ) -> Result<Vec<(String, String)>, GatewayError> {
        let unit_amount = request
            .amount
            .to_cents()
            .map_err(|e| GatewayError::new(GatewayErrorCode::InvalidRequest, e.to_string()))?;

        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
        ];

        if let Some(email) = &request.customer_email {
            params.push(("customer_email".into(), email.clone()));
        }

        for (key, value) in request.purpose.metadata() {
            params.push((format!("metadata[{}]", key), value.clone()));
            params.push((format!("payment_intent_data[metadata][{}]", key), value));
        }

        if let Some(fee) = request.application_fee_cents.filter(|fee| *fee > 0) {
            params.push((
                "payment_intent_data[application_fee_amount]".into(),
                fee.to_string(),
            ));
        }
        if let Some(account) = &request.destination_account {
            params.push((
                "payment_intent_data[transfer_data][destination]".into(),
                account.clone(),
            ));
            params.push(("payment_intent_data[on_behalf_of]".into(), account.clone()));
        }

        params.push(("line_items[0][quantity]".into(), "1".into()));
        params.push((
            "line_items[0][price_data][currency]".into(),
            request.currency.provider_code().into(),
        ));
        params.push((
            "line_items[0][price_data][unit_amount]".into(),
            unit_amount.to_string(),
        ));
        params.push((
            "line_items[0][price_data][product_data][name]".into(),
            request.product_name.clone(),
        ));
        if let Some(description) = &request.description {
            params.push((
                "line_items[0][price_data][product_data][description]".into(),
                description.clone(),
            ));
        }

        Ok(params)
    }

    fn error_for_status(status: reqwest::StatusCode, body: &str) -> GatewayError {
        let code = match status.as_u16() {
            401 | 403 => GatewayErrorCode::AuthenticationError,
            429 => GatewayErrorCode::RateLimited,
            400..=499 => GatewayErrorCode::InvalidRequest,
            _ => GatewayErrorCode::ProviderError,
        };

        match serde_json::from_str::<StripeErrorBody>(body) {
            Ok(parsed) => {
                let message = parsed
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe API error ({})", status));
                let error = GatewayError::new(code, message);
                match parsed.error.code {
                    Some(provider_code) => error.with_provider_code(provider_code),
                    None => error,
                }
            }
            Err(_) => GatewayError::new(code, format!("Stripe API error ({}): {}", status, body)),
        }
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckoutGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = Self::form_params(&request)?;

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = Self::error_for_status(status, &body);
            warn!(
                kind = request.purpose.kind(),
                status = status.as_u16(),
                error = %error,
                "Stripe checkout session creation failed"
            );
            return Err(error);
        }

        let session: StripeCheckoutSession = response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Failed to parse Stripe response: {}", e),
            )
        })?;

        let checkout_url = session.url.clone().ok_or_else(|| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Checkout session {} has no url", session.id),
            )
        })?;

        debug!(session_id = %session.id, kind = request.purpose.kind(), "Opened Stripe checkout session");

        Ok(CheckoutSession {
            id: session.id,
            url: checkout_url,
            provider_payment_intent_id: session.payment_intent,
            expires_at: session
                .expires_at
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(Timestamp::from_datetime),
        })
    }
}
