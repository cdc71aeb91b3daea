// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sensitive-data redaction.
//!
//! Applied to every line published on the `log` topic, every string placed
//! into a classifier/analyzer request, and every environment value read for
//! the root-cause engine's context.

use regex::Regex;
use std::sync::OnceLock;

const REDACTED: &str = "[REDACTED]";

/// Env var key fragments that mark a value as sensitive (case-insensitive
/// substring match).
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &["KEY", "TOKEN", "SECRET", "PASSWORD"];

#[allow(clippy::expect_used)]
fn api_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"sk-[A-Za-z0-9]{20,}").expect("valid regex"))
}

#[allow(clippy::expect_used)]
fn connection_string_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+://[^:/\s]+:[^@/\s]+@").expect("valid regex"))
}

/// Returns true if `key` (an environment variable name) is considered
/// sensitive on its own, independent of its value.
pub fn is_sensitive_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|frag| upper.contains(frag))
}

/// Redact vendor API-key shapes and connection-string credentials from
/// free-form text (log lines, classifier/analyzer prompt bodies).
pub fn redact_text(input: &str) -> String {
    let once = api_key_re().replace_all(input, REDACTED);
    connection_string_re().replace_all(&once, |caps: &regex::Captures| {
        // Replace only the `user:pass@` portion, preserving the scheme.
        let whole = &caps[0];
        let scheme_end = whole.find("://").map(|i| i + 3).unwrap_or(0);
        format!("{}{}@", &whole[..scheme_end], REDACTED)
    }).into_owned()
}

/// Redact an environment map for inclusion in root-cause context: sensitive
/// keys are redacted wholesale, all values additionally pass through
/// [`redact_text`].
pub fn redact_env(env: &[(String, String)]) -> Vec<(String, String)> {
    env.iter()
        .map(|(k, v)| {
            if is_sensitive_key(k) {
                (k.clone(), REDACTED.to_string())
            } else {
                (k.clone(), redact_text(v))
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "redact_tests.rs"]
mod tests;
