//! Redirect URL normalization for hosted checkout pages.

use std::collections::BTreeSet;

use reqwest::Url;

/// Success/cancel urls a checkout may send the payer back to.
///
/// A requested url is kept only when it parses, uses http(s) and its
/// origin is on the allow-list; otherwise the configured default is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    default_success_url: String,
    default_cancel_url: String,
    allowed_origins: BTreeSet<String>,
}

fn http_origin(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    Some(url.origin().ascii_serialization())
}

impl RedirectPolicy {
    /// The default success url's origin is always allowed.
    pub fn new(
        default_success_url: impl Into<String>,
        default_cancel_url: impl Into<String>,
        extra_origins: impl IntoIterator<Item = String>,
    ) -> Self {
        let default_success_url = default_success_url.into();
        let allowed_origins = http_origin(&default_success_url)
            .into_iter()
            .chain(extra_origins.into_iter().filter_map(|o| http_origin(&o)))
            .collect();
        Self {
            default_success_url,
            default_cancel_url: default_cancel_url.into(),
            allowed_origins,
        }
    }

    pub fn success_url(&self, requested: Option<&str>) -> String {
        self.normalize(requested, &self.default_success_url)
    }

    pub fn cancel_url(&self, requested: Option<&str>) -> String {
        self.normalize(requested, &self.default_cancel_url)
    }

    /// Whether a browser `Origin` header may call the checkout endpoints.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty()
            || http_origin(origin).map_or(false, |o| self.allowed_origins.contains(&o))
    }

    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        self.allowed_origins.iter().map(String::as_str)
    }

    fn normalize(&self, requested: Option<&str>, fallback: &str) -> String {
        let Some(candidate) = requested.map(str::trim).filter(|c| !c.is_empty()) else {
            return fallback.to_string();
        };
        let Ok(url) = Url::parse(candidate) else {
            return fallback.to_string();
        };
        if !matches!(url.scheme(), "http" | "https") {
            return fallback.to_string();
        }
        if !self.allowed_origins.is_empty()
            && !self
                .allowed_origins
                .contains(&url.origin().ascii_serialization())
        {
            return fallback.to_string();
        }
        url.to_string()
    }
}
