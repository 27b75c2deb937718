use thiserror::Error;

/// Primary error type for frankenmock verification.
///
/// Variants are grouped by [`ErrorCategory`]: configuration problems with
/// the verified method, illegal usage of the query DSL, and the ordinary
/// "expectation not met" outcome that carries the rendered diagnostic.
#[derive(Error, Debug)]
pub enum MockError {
    // === Configuration Errors ===
    /// The method was never configured on the double, and the double is not
    /// a null object.
    #[error(
        "{target} expected to have received {method}, but that object is not a spy or method has not been stubbed."
    )]
    NotStubbed { target: String, method: String },

    /// The method carries its own mock expectation and cannot be verified
    /// after the fact.
    #[error(
        "{target} expected to have received {method}, but that method has been mocked instead of stubbed or spied."
    )]
    MockedInsteadOfStubbed { target: String, method: String },

    // === Usage Errors ===
    /// A negated query was combined with a count or ordering combinator.
    #[error("can't use {combinator} when negative")]
    NegatedCombinator { combinator: String },

    /// `ordered` combined with `at_least`/`at_most` while the session
    /// configuration disallows vague counts in ordered chains.
    #[error("can't use {combinator} with ordered")]
    OrderedVagueCount { combinator: String },

    /// The verification was issued through an entry point that cannot
    /// verify received messages.
    #[error(
        "Using {target}(...) with the `have_received` matcher is not supported{}.",
        no_effect_suffix(.no_effect)
    )]
    UnsupportedTarget {
        target: &'static str,
        no_effect: bool,
    },

    // === Assertion Errors ===
    /// The recorded calls did not satisfy the query.
    #[error("{diagnostic}")]
    ExpectationNotMet { diagnostic: String },

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_effect_suffix(no_effect: &bool) -> &'static str {
    if *no_effect {
        " as it would have no effect"
    } else {
        ""
    }
}

/// Coarse classification of [`MockError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// The verified method is not configured in a verifiable way.
    Configuration = 1,
    /// The query or its entry point is illegal.
    UnsupportedUsage = 2,
    /// Normal assertion failure of a test.
    Assertion = 3,
    /// Engine bug.
    Internal = 4,
}

impl MockError {
    /// Map this error to its category.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::NotStubbed { .. } | Self::MockedInsteadOfStubbed { .. } => {
                ErrorCategory::Configuration
            }
            Self::NegatedCombinator { .. }
            | Self::OrderedVagueCount { .. }
            | Self::UnsupportedTarget { .. } => ErrorCategory::UnsupportedUsage,
            Self::ExpectationNotMet { .. } => ErrorCategory::Assertion,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this is the expected failure mode of a test rather than a
    /// misuse of the engine.
    pub const fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::ExpectationNotMet { .. })
    }

    /// Whether this error was raised before any ledger access because the
    /// query itself is illegal.
    pub const fn is_usage_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::UnsupportedUsage)
    }

    /// Whether the verified method is not configured for verification.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::Configuration)
    }

    /// The rendered failure text, for assertion failures.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ExpectationNotMet { diagnostic } => Some(diagnostic),
            _ => None,
        }
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotStubbed { .. } => {
                Some("Stub the method with allow(...) before verifying it, or use a null object")
            }
            Self::MockedInsteadOfStubbed { .. } => {
                Some("Verify mocked methods through their own expectation, or stub instead")
            }
            Self::NegatedCombinator { .. } => {
                Some("Use a positive expectation with exactly(0) style counts instead")
            }
            Self::OrderedVagueCount { .. } => {
                Some("Use exact counts (once, twice, exactly(n)) with ordered")
            }
            Self::UnsupportedTarget { .. } => Some("Use expect(double).to have_received(...)"),
            _ => None,
        }
    }

    /// Create a not-stubbed error.
    pub fn not_stubbed(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NotStubbed {
            target: target.into(),
            method: method.into(),
        }
    }

    /// Create a mocked-instead-of-stubbed error.
    pub fn mocked(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MockedInsteadOfStubbed {
            target: target.into(),
            method: method.into(),
        }
    }

    /// Create a negated-combinator usage error.
    pub fn negated(combinator: impl Into<String>) -> Self {
        Self::NegatedCombinator {
            combinator: combinator.into(),
        }
    }

    /// Create an assertion failure carrying `diagnostic`.
    pub fn expectation_not_met(diagnostic: impl Into<String>) -> Self {
        Self::ExpectationNotMet {
            diagnostic: diagnostic.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `MockError`.
pub type Result<T> = std::result::Result<T, MockError>;
