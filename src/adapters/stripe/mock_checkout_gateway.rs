//! Mock checkout gateway for tests and local runs without a Stripe key.
//!
//! Supports:
//! - Error injection
//! - Request tracking
//! - Provider-style idempotency (same key, same session)

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CheckoutGateway, CheckoutRequest, CheckoutSession, GatewayError, GatewayErrorCode,
};

/// Mock checkout gateway.
///
/// # Example
///
/// ```ignore
/// let gateway = MockCheckoutGateway::new();
/// gateway.set_error(GatewayError::network("timeout"));
/// let result = gateway.create_checkout_session(request).await;
/// assert!(result.is_err());
/// ```
#[derive(Default, Clone)]
pub struct MockCheckoutGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Error returned by the next call only.
    next_error: Option<GatewayError>,

    /// Sessions already opened, by idempotency key.
    sessions: HashMap<String, CheckoutSession>,

    /// Every request received, in order.
    requests: Vec<CheckoutRequest>,
}

impl MockCheckoutGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspection access; a poisoned lock still yields the recorded state.
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call with `error`.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.state().requests.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Distinct sessions opened so far.
    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }
}

#[async_trait]
impl CheckoutGateway for MockCheckoutGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| GatewayError::new(GatewayErrorCode::ProviderError, "mock state poisoned"))?;
        state.requests.push(request.clone());

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        let n = state.sessions.len() + 1;
        let session = state
            .sessions
            .entry(request.idempotency_key.clone())
            .or_insert_with(|| CheckoutSession {
                id: format!("cs_mock_{}", n),
                url: format!("https://checkout.mock/pay/cs_mock_{}", n),
                provider_payment_intent_id: Some(format!("pi_mock_{}", n)),
                expires_at: None,
            })
            .clone();
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Currency, Money, OrganizerId};
    use crate::ports::CheckoutPurpose;

    fn request(key: &str) -> CheckoutRequest {
        CheckoutRequest {
            purpose: CheckoutPurpose::SponsorModule {
                organizer_id: OrganizerId::new(),
            },
            idempotency_key: key.to_string(),
            product_name: "Sponsor module activation".to_string(),
            description: None,
            amount: Money::from_cents(2500),
            currency: Currency::Eur,
            application_fee_cents: None,
            destination_account: None,
            customer_email: None,
            success_url: "https://a/ok".to_string(),
            cancel_url: "https://a/ko".to_string(),
        }
    }

    #[tokio::test]
    async fn same_idempotency_key_returns_same_session() {
        let gateway = MockCheckoutGateway::new();
        let a = gateway.create_checkout_session(request("k1")).await.unwrap();
        let b = gateway.create_checkout_session(request("k1")).await.unwrap();
        let c = gateway.create_checkout_session(request("k2")).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        assert_eq!(gateway.call_count(), 3);
        assert_eq!(gateway.session_count(), 2);
    }

    #[tokio::test]
    async fn injected_error_fails_only_next_call() {
        let gateway = MockCheckoutGateway::new();
        gateway.set_error(GatewayError::network("timeout"));

        assert!(gateway.create_checkout_session(request("k1")).await.is_err());
        assert!(gateway.create_checkout_session(request("k1")).await.is_ok());
    }

    #[tokio::test]
    async fn poisoned_state_fails_calls_without_panicking() {
        let gateway = MockCheckoutGateway::new();
        gateway.create_checkout_session(request("k1")).await.unwrap();

        let held = gateway.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = held.inner.lock().unwrap();
            panic!("crash while holding the mock state");
        })
        .join();
        assert!(crashed.is_err());
        assert!(gateway.inner.is_poisoned());

        let err = gateway
            .create_checkout_session(request("k2"))
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::ProviderError);

        assert_eq!(gateway.call_count(), 1);
        assert_eq!(gateway.session_count(), 1);
        gateway.set_error(GatewayError::network("timeout"));
        assert_eq!(gateway.requests().len(), 1);
    }
}
