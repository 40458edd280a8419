//! Sponsor slot entity and window planning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    Currency, EventId, Money, OrganizerId, SponsorSlotId, StateMachine, Timestamp,
    ValidationError,
};
use crate::domain::registration::{EntityKind, PaymentError};

use super::SponsorSlotStatus;

const DAY_MILLIS: i64 = 86_400_000;

/// Contract text shown to the sponsor, one string per supported language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractTerms {
    pub it: String,
    pub en: String,
}

impl ContractTerms {
    fn build(
        name_it: &str,
        name_en: &str,
        event_name: &str,
        package_days: u32,
        amount: Money,
        currency: Currency,
        window: &SlotWindow,
    ) -> Self {
        let fmt = |t: &Timestamp| t.as_datetime().format("%Y-%m-%d %H:%M").to_string();
        let period = format!("{} - {}", fmt(&window.starts_at), fmt(&window.ends_at));
        let amount_line = format!("{} {}", currency.code(), amount);

        Self {
            it: format!(
                "Contratto sponsor per \"{}\" su evento \"{}\". Pacchetto {} giorni ({}), importo {}. \
                 Visibilita banner solo con pagamento confermato, slot attivo e non scaduto.",
                name_it, event_name, package_days, period, amount_line
            ),
            en: format!(
                "Sponsor contract for \"{}\" on event \"{}\". {}-day package ({}), amount {}. \
                 Banner visibility only after confirmed payment, active slot and not expired.",
                name_en, event_name, package_days, period, amount_line
            ),
        }
    }
}

/// Display window of a slot, bounded by the event's remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub max_package_days: u32,
}

/// Plans the window for a package bought at `now`.
///
/// The event stays open until 23:59:59.999 UTC of its date. The longest
/// package is the remaining lifetime rounded up to whole days, at least one.
pub fn plan_window(
    event_date: NaiveDate,
    package_days: u32,
    now: Timestamp,
) -> Result<SlotWindow, PaymentError> {
    if package_days == 0 {
        return Err(ValidationError::not_positive("packageDays").into());
    }

    let event_end = Timestamp::end_of_day(event_date);
    if !event_end.is_after(&now) {
        return Err(ValidationError::invalid_format(
            "eventDate",
            "event already ended, sponsor package cannot be created",
        )
        .into());
    }

    let remaining = event_end.duration_since(&now).num_milliseconds();
    let max_days = ((remaining + DAY_MILLIS - 1) / DAY_MILLIS).max(1);
    let max_package_days = u32::try_from(max_days).unwrap_or(u32::MAX);

    if package_days > max_package_days {
        return Err(PaymentError::PackageExceedsEventLifetime {
            requested: package_days,
            max_package_days,
        });
    }

    Ok(SlotWindow {
        starts_at: now,
        ends_at: now.plus_days(i64::from(package_days)).earliest(event_end),
        max_package_days,
    })
}

/// Sponsor details supplied by the organizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorDetails {
    pub sponsor_name: String,
    pub sponsor_name_it: String,
    pub sponsor_name_en: String,
    pub sponsor_url: Option<String>,
    pub sponsor_logo_url: Option<String>,
    pub payer_email: Option<String>,
}

impl SponsorDetails {
    /// Resolves localized names, each falling back to the other provided names.
    pub fn new(
        name: Option<&str>,
        name_it: Option<&str>,
        name_en: Option<&str>,
        url: Option<&str>,
        logo_url: Option<&str>,
        payer_email: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let clean = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from);

        let sponsor_name = clean(name)
            .or_else(|| clean(name_it))
            .or_else(|| clean(name_en))
            .ok_or_else(|| ValidationError::empty_field("sponsorName"))?;

        Ok(Self {
            sponsor_name_it: clean(name_it).unwrap_or_else(|| sponsor_name.clone()),
            sponsor_name_en: clean(name_en).unwrap_or_else(|| sponsor_name.clone()),
            sponsor_name,
            sponsor_url: clean(url),
            sponsor_logo_url: clean(logo_url),
            payer_email: clean(payer_email).map(|e| e.to_lowercase()),
        })
    }
}

/// Time-boxed advertising placement on one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorSlot {
    pub id: SponsorSlotId,
    pub event_id: EventId,
    pub organizer_id: OrganizerId,
    pub sponsor_name: String,
    pub sponsor_name_it: String,
    pub sponsor_name_en: String,
    pub sponsor_url: Option<String>,
    pub sponsor_logo_url: Option<String>,
    pub package_days: u32,
    pub amount: Money,
    pub currency: Currency,
    pub contract_terms: ContractTerms,
    pub status: SponsorSlotStatus,
    /// Visibility as of the last mutation. Readers use [`SponsorSlot::is_visible_at`].
    pub active: bool,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub checkout_session_id: Option<String>,
    pub provider_payment_intent_id: Option<String>,
    pub payment_link_url: Option<String>,
    pub payer_email: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SponsorSlot {
    /// Creates a `pending_payment` slot with its window and contract terms.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        event_id: EventId,
        organizer_id: OrganizerId,
        event_name: &str,
        event_date: NaiveDate,
        details: SponsorDetails,
        package_days: u32,
        amount: Money,
        currency: Currency,
        now: Timestamp,
    ) -> Result<(Self, SlotWindow), PaymentError> {
        let amount = amount.ensure_chargeable("amount")?.round2();
        let window = plan_window(event_date, package_days, now)?;
        let contract_terms = ContractTerms::build(
            &details.sponsor_name_it,
            &details.sponsor_name_en,
            event_name,
            package_days,
            amount,
            currency,
            &window,
        );

        let slot = Self {
            id: SponsorSlotId::new(),
            event_id,
            organizer_id,
            sponsor_name: details.sponsor_name,
            sponsor_name_it: details.sponsor_name_it,
            sponsor_name_en: details.sponsor_name_en,
            sponsor_url: details.sponsor_url,
            sponsor_logo_url: details.sponsor_logo_url,
            package_days,
            amount,
            currency,
            contract_terms,
            status: SponsorSlotStatus::PendingPayment,
            active: false,
            starts_at: window.starts_at,
            ends_at: window.ends_at,
            paid_at: None,
            cancelled_at: None,
            checkout_session_id: None,
            provider_payment_intent_id: None,
            payment_link_url: None,
            payer_email: details.payer_email,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        Ok((slot, window))
    }

    /// Banner is shown only for a paid slot inside `[starts_at, ends_at)`.
    pub fn is_visible_at(&self, now: &Timestamp) -> bool {
        self.status == SponsorSlotStatus::Active
            && !now.is_before(&self.starts_at)
            && now.is_before(&self.ends_at)
    }

    /// Whether the window closed strictly before `now`.
    pub fn window_ended(&self, now: &Timestamp) -> bool {
        !self.ends_at.is_after(now)
    }

    /// Returns a copy moved to `target`, stamped with `at`.
    ///
    /// The window is never touched.
    pub fn transitioned(
        &self,
        target: SponsorSlotStatus,
        at: Timestamp,
    ) -> Result<Self, PaymentError> {
        if !self.status.can_transition_to(&target) {
            return Err(PaymentError::invalid_transition(
                EntityKind::SponsorSlot,
                self.status,
                target,
            ));
        }

        let mut next = self.clone();
        next.status = target;
        next.updated_at = at;
        match target {
            SponsorSlotStatus::Active => next.paid_at = Some(at),
            SponsorSlotStatus::Cancelled => next.cancelled_at = Some(at),
            _ => {}
        }
        next.active = next.is_visible_at(&at);
        Ok(next)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn details() -> SponsorDetails {
        SponsorDetails::new(Some("Bici Rossi"), None, None, None, None, Some("Pay@Bici.IT")).unwrap()
    }

    pub fn slot(event_date: NaiveDate, package_days: u32, now: Timestamp) -> SponsorSlot {
        SponsorSlot::create(
            EventId::new(),
            OrganizerId::new(),
            "Trail del Monte",
            event_date,
            details(),
            package_days,
            Money::from_cents(5000),
            Currency::Eur,
            now,
        )
        .unwrap()
        .0
    }
}
