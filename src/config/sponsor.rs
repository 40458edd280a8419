//! Sponsor module configuration

use serde::Deserialize;

use crate::domain::foundation::{Currency, Money};

use super::error::ValidationError;

/// Pricing of the organizer sponsor module
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SponsorConfig {
    /// One-off activation price; unset or zero falls back to the built-in price
    pub activation_amount: Option<Money>,

    /// Currency of sponsor checkouts
    #[serde(default)]
    pub currency: Currency,
}

impl SponsorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self
            .activation_amount
            .map_or(false, |m| m.amount().is_sign_negative())
        {
            return Err(ValidationError::NegativeAmount("activation_amount"));
        }
        Ok(())
    }
}
