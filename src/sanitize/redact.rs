// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Key redaction for sanitized metadata.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Keys that are always stripped, compared after normalization.
static DEFAULT_REDACTED_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password",
        "passwd",
        "token",
        "secret",
        "access_token",
        "refresh_token",
        "id_token",
        "api_key",
        "apikey",
        "authorization",
        "cookie",
        "session_token",
        "private_key",
        "client_secret",
        // Navigation handles are large, unstable and not useful telemetry.
        "navigation",
        "navigator",
        "route",
    ]
    .into_iter()
    .collect()
});

/// Decides which map keys are replaced by `[Stripped]`.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    extra_keys: HashSet<String>,
    patterns: Vec<Regex>,
}

impl Redactor {
    /// A redactor using only the built-in denylist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add keys to the denylist.
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_keys
            .extend(keys.into_iter().map(|k| normalize(k.as_ref())));
        self
    }

    /// Add case-insensitive regex patterns matched against raw keys.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let regex = RegexBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .build()?;
            self.patterns.push(regex);
        }
        Ok(self)
    }

    /// Whether the value under `key` must be stripped.
    pub fn is_redacted(&self, key: &str) -> bool {
        let normalized = normalize(key);
        DEFAULT_REDACTED_KEYS.contains(normalized.as_str())
            || self.extra_keys.contains(&normalized)
            || self.patterns.iter().any(|p| p.is_match(key))
    }
}

/// Lowercase with `_` separators: `accessToken`, `Access-Token` and
/// `access_token` all compare equal.
fn normalize(key: &str) -> String {
    let key = key.trim();
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        if ch == '-' {
            out.push('_');
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_denylist() {
        let redactor = Redactor::new();
        for key in ["password", "token", "secret", "access_token", "route", "navigation"] {
            assert!(redactor.is_redacted(key), "{} should be redacted", key);
        }
        assert!(!redactor.is_redacted("username"));
        assert!(!redactor.is_redacted("booking_id"));
    }

    #[test]
    fn test_normalization() {
        let redactor = Redactor::new();
        assert!(redactor.is_redacted("Password"));
        assert!(redactor.is_redacted("ACCESS-TOKEN"));
        assert!(redactor.is_redacted(" Authorization "));
    }

    #[test]
    fn test_camel_case_keys() {
        let redactor = Redactor::new();
        for key in ["accessToken", "refreshToken", "apiKey", "clientSecret", "AccessToken", "APIKey"] {
            assert!(redactor.is_redacted(key), "{} should be redacted", key);
        }
        assert!(!redactor.is_redacted("tokenCount"));
        assert!(!redactor.is_redacted("routeName"));

        let extra = Redactor::new().with_keys(["card_number"]);
        assert!(extra.is_redacted("cardNumber"));
    }

    #[test]
    fn test_extra_keys() {
        let redactor = Redactor::new().with_keys(["card-number"]);
        assert!(redactor.is_redacted("card_number"));
        assert!(redactor.is_redacted("Card-Number"));
    }

    #[test]
    fn test_patterns() {
        let redactor = Redactor::new().with_patterns([r"_token$"]).unwrap();
        assert!(redactor.is_redacted("stripe_TOKEN"));
        assert!(!redactor.is_redacted("token_count"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Redactor::new().with_patterns(["("]).is_err());
    }
}
