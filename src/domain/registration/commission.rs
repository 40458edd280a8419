//! Platform commission and organizer net amount.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{round2, Money, ValidationError};

/// Flat platform cut applied to every paid registration.
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(3, 0, 0, false, 2);

/// Fee and rate inputs for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionInput {
    pub fee_amount: Money,
    pub developer_commission_rate: Decimal,
    pub provider_fee_rate: Decimal,
    pub provider_fee_fixed: Money,
}

impl CommissionInput {
    /// Fee with the default platform rate and no provider costs.
    pub fn for_fee(fee_amount: Money) -> Self {
        Self {
            fee_amount,
            developer_commission_rate: DEFAULT_COMMISSION_RATE,
            provider_fee_rate: Decimal::ZERO,
            provider_fee_fixed: Money::ZERO,
        }
    }
}

/// Derived amounts, each rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    pub commission_amount: Money,
    pub provider_fee_amount: Money,
    pub organizer_net_amount: Money,
}

/// Computes commission, provider fee and organizer net.
///
/// The net is computed from unrounded parts and rounded once, floored at zero.
/// Free events yield all zeros except a possibly negative net, which floors too.
pub fn compute_commission(input: &CommissionInput) -> CommissionBreakdown {
    let fee = input.fee_amount.amount();
    if fee.is_zero() {
        return CommissionBreakdown {
            commission_amount: Money::ZERO,
            provider_fee_amount: Money::ZERO,
            organizer_net_amount: Money::ZERO,
        };
    }

    let commission = fee * input.developer_commission_rate;
    let provider_fee = fee * input.provider_fee_rate + input.provider_fee_fixed.amount();
    let net = fee - commission - provider_fee;

    CommissionBreakdown {
        commission_amount: Money::new(round2(commission)),
        provider_fee_amount: Money::new(round2(provider_fee)),
        organizer_net_amount: Money::new(round2(net)).clamp_non_negative(),
    }
}

/// Platform fee in cents passed to the checkout provider.
///
/// Clamped to `[0, amount]` so the provider never rejects the session.
/// Fails when either amount has no cent representation.
pub fn application_fee_cents(amount: Money, commission: Money) -> Result<i64, ValidationError> {
    let cap = amount.to_cents()?.max(0);
    Ok(commission.to_cents()?.clamp(0, cap))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_rate_is_three_percent() {
        assert_eq!(DEFAULT_COMMISSION_RATE, dec!(0.03));
    }

    #[test]
    fn commission_on_twenty_five_euro_is_seventy_five_cents() {
        let out = compute_commission(&CommissionInput::for_fee(Money::new(dec!(25.00))));
        assert_eq!(out.commission_amount, Money::new(dec!(0.75)));
        assert_eq!(out.organizer_net_amount, Money::new(dec!(24.25)));
    }

    #[test]
    fn net_after_provider_fees_rounds_half_up() {
        let out = compute_commission(&CommissionInput {
            fee_amount: Money::new(dec!(25.00)),
            developer_commission_rate: dec!(0.03),
            provider_fee_rate: dec!(0.015),
            provider_fee_fixed: Money::new(dec!(0.25)),
        });
        // 25 - 0.75 - 0.375 - 0.25 = 23.625
        assert_eq!(out.organizer_net_amount, Money::new(dec!(23.63)));
        assert_eq!(out.provider_fee_amount, Money::new(dec!(0.63)));
    }

    #[test]
    fn free_events_have_zero_commission() {
        let out = compute_commission(&CommissionInput::for_fee(Money::ZERO));
        assert_eq!(out.commission_amount, Money::ZERO);
        assert_eq!(out.organizer_net_amount, Money::ZERO);
    }

    #[test]
    fn net_never_goes_negative() {
        let out = compute_commission(&CommissionInput {
            fee_amount: Money::new(dec!(0.10)),
            developer_commission_rate: dec!(0.03),
            provider_fee_rate: dec!(0.015),
            provider_fee_fixed: Money::new(dec!(0.25)),
        });
        assert_eq!(out.organizer_net_amount, Money::ZERO);
    }

    #[test]
    fn application_fee_is_clamped_to_amount() {
        assert_eq!(application_fee_cents(Money::new(dec!(25)), Money::new(dec!(0.75))), Ok(75));
        assert_eq!(application_fee_cents(Money::new(dec!(0.5)), Money::new(dec!(2))), Ok(50));
        assert_eq!(application_fee_cents(Money::new(dec!(10)), Money::new(dec!(-1))), Ok(0));
    }

    #[test]
    fn application_fee_on_unrepresentable_amount_is_an_error() {
        let huge = Money::new(Decimal::MAX);
        assert!(application_fee_cents(huge, Money::new(dec!(0.75))).is_err());
        assert!(application_fee_cents(Money::new(dec!(25)), huge).is_err());
    }

    proptest! {
        #[test]
        fn amounts_have_at_most_two_decimals(cents in 0i64..10_000_000, rate_bp in 0u32..2_000) {
            let out = compute_commission(&CommissionInput {
                fee_amount: Money::from_cents(cents),
                developer_commission_rate: Decimal::new(rate_bp as i64, 4),
                provider_fee_rate: dec!(0.015),
                provider_fee_fixed: Money::new(dec!(0.25)),
            });
            prop_assert!(out.commission_amount.amount().scale() <= 2);
            prop_assert!(out.organizer_net_amount.amount().scale() <= 2);
            prop_assert!(!out.organizer_net_amount.amount().is_sign_negative());
            prop_assert!(out.organizer_net_amount <= Money::from_cents(cents));
        }
    }
}
