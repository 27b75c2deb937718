//! Verifier configuration.

use serde::{Deserialize, Serialize};

/// Session-level switches for the verification engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Allow `ordered` together with `at_least`/`at_most`.
    pub ordered_vague_counts: bool,
    /// Append a `Diff:` section to unexpected-argument failures that cover
    /// a single recorded call.
    pub diff_single_call: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            ordered_vague_counts: true,
            diff_single_call: true,
        }
    }
}

impl VerifierConfig {
    /// Build the configuration from environment variables.
    ///
    /// - `FMOCK_ORDERED_VAGUE_COUNTS`: `1`/`true` or `0`/`false` (default: true)
    /// - `FMOCK_DIFF_SINGLE_CALL`: `1`/`true` or `0`/`false` (default: true)
    ///
    /// Unrecognised values keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`VerifierConfig::from_env`], reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            ordered_vague_counts: lookup("FMOCK_ORDERED_VAGUE_COUNTS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.ordered_vague_counts),
            diff_single_call: lookup("FMOCK_DIFF_SINGLE_CALL")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.diff_single_call),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    let value = value.trim();
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
