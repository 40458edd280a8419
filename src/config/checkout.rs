//! Hosted checkout redirect configuration

use reqwest::Url;
use serde::Deserialize;

use crate::application::RedirectPolicy;

use super::error::ValidationError;
use super::split_list;

/// Where payers land after leaving the hosted checkout page
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default = "default_participant_success_url")]
    pub participant_success_url: String,

    #[serde(default = "default_participant_cancel_url")]
    pub participant_cancel_url: String,

    /// Extra origins participant clients may redirect to (comma-separated)
    pub participant_allowed_origins: Option<String>,

    #[serde(default = "default_sponsor_success_url")]
    pub sponsor_success_url: String,

    #[serde(default = "default_sponsor_cancel_url")]
    pub sponsor_cancel_url: String,

    /// Extra origins sponsor clients may redirect to (comma-separated)
    pub sponsor_allowed_origins: Option<String>,
}

impl CheckoutConfig {
    pub fn participant_policy(&self) -> RedirectPolicy {
        RedirectPolicy::new(
            &self.participant_success_url,
            &self.participant_cancel_url,
            split_list(self.participant_allowed_origins.as_deref()),
        )
    }

    pub fn sponsor_policy(&self) -> RedirectPolicy {
        RedirectPolicy::new(
            &self.sponsor_success_url,
            &self.sponsor_cancel_url,
            split_list(self.sponsor_allowed_origins.as_deref()),
        )
    }

    /// Default urls must be absolute http(s) urls.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("participant_success_url", &self.participant_success_url),
            ("participant_cancel_url", &self.participant_cancel_url),
            ("sponsor_success_url", &self.sponsor_success_url),
            ("sponsor_cancel_url", &self.sponsor_cancel_url),
        ] {
            let ok = Url::parse(value)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !ok {
                return Err(ValidationError::InvalidRedirectUrl(name));
            }
        }
        Ok(())
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            participant_success_url: default_participant_success_url(),
            participant_cancel_url: default_participant_cancel_url(),
            participant_allowed_origins: None,
            sponsor_success_url: default_sponsor_success_url(),
            sponsor_cancel_url: default_sponsor_cancel_url(),
            sponsor_allowed_origins: None,
        }
    }
}

fn default_participant_success_url() -> String {
    "https://eventigare.app/participant/payment/success".to_string()
}

fn default_participant_cancel_url() -> String {
    "https://eventigare.app/participant/payment/cancel".to_string()
}

fn default_sponsor_success_url() -> String {
    "https://eventigare.app/sponsor/success".to_string()
}

fn default_sponsor_cancel_url() -> String {
    "https://eventigare.app/sponsor/cancel".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policies_allow_configured_origins() {
        let config = CheckoutConfig {
            participant_allowed_origins: Some("http://localhost:19006, ".to_string()),
            ..Default::default()
        };
        let participant = config.participant_policy();
        assert!(participant.is_origin_allowed("http://localhost:19006"));
        assert!(participant.is_origin_allowed("https://eventigare.app"));

        let sponsor = config.sponsor_policy();
        assert!(!sponsor.is_origin_allowed("http://localhost:19006"));
        assert_eq!(sponsor.success_url(None), "https://eventigare.app/sponsor/success");
    }

    #[test]
    fn test_relative_default_url_is_rejected() {
        let config = CheckoutConfig {
            sponsor_cancel_url: "/sponsor/cancel".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidRedirectUrl("sponsor_cancel_url"))
        );
    }
}
