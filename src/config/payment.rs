//! Payment configuration

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{Currency, Money};
use crate::domain::registration::{RegistrationPricing, DEFAULT_COMMISSION_RATE};

use super::error::ValidationError;
use super::server::Environment;

/// Payment configuration (Stripe and registration pricing)
#[derive(Debug, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key; required unless the mock gateway is used
    pub stripe_secret_key: Option<SecretString>,

    /// Stripe API base URL
    #[serde(default = "default_stripe_api_base_url")]
    pub stripe_api_base_url: String,

    /// Open checkout sessions against the in-process mock gateway
    #[serde(default)]
    pub use_mock_gateway: bool,

    /// Length of an online payment session in minutes
    #[serde(default = "default_session_minutes")]
    pub session_minutes: i64,

    /// Platform commission rate applied to every paid registration
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,

    /// Provider percentage fee
    #[serde(default)]
    pub provider_fee_rate: Decimal,

    /// Provider fixed fee per transaction
    #[serde(default)]
    pub provider_fee_fixed: Money,

    /// Currency of registration fees
    #[serde(default)]
    pub currency: Currency,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            stripe_api_base_url: default_stripe_api_base_url(),
            use_mock_gateway: false,
            session_minutes: default_session_minutes(),
            commission_rate: default_commission_rate(),
            provider_fee_rate: Decimal::ZERO,
            provider_fee_fixed: Money::ZERO,
            currency: Currency::default(),
        }
    }
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.key_starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.key_starts_with("sk_live_")
    }

    fn key_starts_with(&self, prefix: &str) -> bool {
        self.stripe_secret_key
            .as_ref()
            .map_or(false, |k| k.expose_secret().starts_with(prefix))
    }

    /// Pricing handed to new registrations.
    pub fn pricing(&self) -> RegistrationPricing {
        RegistrationPricing {
            commission_rate: self.commission_rate,
            provider_fee_rate: self.provider_fee_rate,
            provider_fee_fixed: self.provider_fee_fixed,
            currency: self.currency,
            session_minutes: self.session_minutes,
        }
    }

    /// Validate payment configuration
    pub fn validate(&self, environment: Environment) -> Result<(), ValidationError> {
        if self.use_mock_gateway {
            if environment.is_production() {
                return Err(ValidationError::MockGatewayInProduction);
            }
        } else {
            let key = self
                .stripe_secret_key
                .as_ref()
                .ok_or(ValidationError::MissingRequired("PAYMENT__STRIPE_SECRET_KEY"))?;
            if !key.expose_secret().starts_with("sk_") {
                return Err(ValidationError::InvalidStripeKey);
            }
        }

        if !(1..=1440).contains(&self.session_minutes) {
            return Err(ValidationError::InvalidSessionLength);
        }
        if !is_unit_rate(self.commission_rate) {
            return Err(ValidationError::InvalidRate("commission_rate"));
        }
        if !is_unit_rate(self.provider_fee_rate) {
            return Err(ValidationError::InvalidRate("provider_fee_rate"));
        }
        if self.provider_fee_fixed.amount().is_sign_negative() {
            return Err(ValidationError::NegativeAmount("provider_fee_fixed"));
        }
        Ok(())
    }
}

fn is_unit_rate(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}

fn default_stripe_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_session_minutes() -> i64 {
    15
}

fn default_commission_rate() -> Decimal {
    DEFAULT_COMMISSION_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn with_key(key: &str) -> PaymentConfig {
        PaymentConfig {
            stripe_secret_key: Some(SecretString::new(key.to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_test_mode() {
        let config = with_key("sk_test_xxx");
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_validation_missing_key() {
        let config = PaymentConfig::default();
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::MissingRequired("PAYMENT__STRIPE_SECRET_KEY"))
        );
    }

    #[test]
    fn test_validation_invalid_key_prefix() {
        let config = with_key("pk_test_xxx");
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidStripeKey)
        );
    }

    #[test]
    fn test_mock_gateway_needs_no_key_outside_production() {
        let config = PaymentConfig {
            use_mock_gateway: true,
            ..Default::default()
        };
        assert!(config.validate(Environment::Development).is_ok());
        assert_eq!(
            config.validate(Environment::Production),
            Err(ValidationError::MockGatewayInProduction)
        );
    }

    #[test]
    fn test_rates_must_be_fractions() {
        let config = PaymentConfig {
            commission_rate: dec!(1.5),
            ..with_key("sk_test_xxx")
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidRate("commission_rate"))
        );
    }

    #[test]
    fn test_session_length_bounds() {
        let config = PaymentConfig {
            session_minutes: 0,
            ..with_key("sk_test_xxx")
        };
        assert_eq!(
            config.validate(Environment::Development),
            Err(ValidationError::InvalidSessionLength)
        );
    }

    #[test]
    fn test_pricing_defaults() {
        let pricing = with_key("sk_test_xxx").pricing();
        assert_eq!(pricing, RegistrationPricing::default());
    }
}
