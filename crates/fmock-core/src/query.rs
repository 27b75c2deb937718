//! Verification queries and the `have_received` matcher builder.
//!
//! A [`VerificationQuery`] is built once per assertion and consumed once by
//! the evaluator. Illegal combinations are rejected while building, so a
//! query that exists is always legal to evaluate.

use std::fmt;

use fmock_error::{MockError, Result};
use fmock_types::{ArgValue, CallBlock, CountArg, CountConstraint, DoubleRef};

use crate::config::VerifierConfig;
use crate::diagnostics;
use crate::matcher::ArgumentPattern;

/// Callback invoked once per matched call with that call's arguments and
/// block. Failures inside it are panics and propagate untouched.
pub type VerifyCallback<'a> = Box<dyn FnMut(&[ArgValue], Option<&CallBlock>) + 'a>;

/// DSL combinators, in the order a test author can chain them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    Exactly,
    AtLeast,
    AtMost,
    Times,
    Time,
    Once,
    Twice,
    Thrice,
    Ordered,
}

impl Combinator {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exactly => "exactly",
            Self::AtLeast => "at_least",
            Self::AtMost => "at_most",
            Self::Times => "times",
            Self::Time => "time",
            Self::Once => "once",
            Self::Twice => "twice",
            Self::Thrice => "thrice",
            Self::Ordered => "ordered",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// VerificationQuery
// ---------------------------------------------------------------------------

/// One assertion against the calls a double received.
pub struct VerificationQuery<'a> {
    pub(crate) double: DoubleRef,
    pub(crate) method_name: String,
    pub(crate) pattern: Option<ArgumentPattern>,
    pub(crate) count: CountConstraint,
    pub(crate) ordered: bool,
    pub(crate) negative: bool,
    pub(crate) callback: Option<VerifyCallback<'a>>,
}

impl fmt::Debug for VerificationQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationQuery")
            .field("double", &self.double)
            .field("method_name", &self.method_name)
            .field("pattern", &self.pattern)
            .field("count", &self.count)
            .field("ordered", &self.ordered)
            .field("negative", &self.negative)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl<'a> VerificationQuery<'a> {
    /// Start building a query for `method` on `double`.
    pub fn builder(double: DoubleRef, method: impl Into<String>) -> QueryBuilder<'a> {
        QueryBuilder {
            query: VerificationQuery {
                double,
                method_name: method.into(),
                pattern: None,
                count: CountConstraint::Unconstrained,
                ordered: false,
                negative: false,
                callback: None,
            },
        }
    }

    pub const fn double(&self) -> &DoubleRef {
        &self.double
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub const fn pattern(&self) -> Option<&ArgumentPattern> {
        self.pattern.as_ref()
    }

    pub const fn count(&self) -> CountConstraint {
        self.count
    }

    pub const fn is_ordered(&self) -> bool {
        self.ordered
    }

    pub const fn is_negative(&self) -> bool {
        self.negative
    }

    pub const fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Session-level legality: vague counts in ordered chains may be
    /// switched off by configuration.
    pub(crate) fn check_config(&self, config: &VerifierConfig) -> Result<()> {
        let vague = matches!(
            self.count,
            CountConstraint::AtLeast(_) | CountConstraint::AtMost(_)
        );
        match self.count.combinator_name() {
            Some(name) if vague && self.ordered && !config.ordered_vague_counts => {
                Err(MockError::OrderedVagueCount {
                    combinator: name.to_owned(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Low-level builder for [`VerificationQuery`].
pub struct QueryBuilder<'a> {
    query: VerificationQuery<'a>,
}

impl<'a> QueryBuilder<'a> {
    #[must_use]
    pub fn with_pattern(mut self, pattern: ArgumentPattern) -> Self {
        self.query.pattern = Some(pattern);
        self
    }

    #[must_use]
    pub const fn count(mut self, count: CountConstraint) -> Self {
        self.query.count = count;
        self
    }

    #[must_use]
    pub const fn ordered(mut self) -> Self {
        self.query.ordered = true;
        self
    }

    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.query.negative = true;
        self
    }

    #[must_use]
    pub fn callback(mut self, callback: impl FnMut(&[ArgValue], Option<&CallBlock>) + 'a) -> Self {
        self.query.callback = Some(Box::new(callback));
        self
    }

    /// Validate and finish the query.
    ///
    /// A negated query must not carry a count constraint or `ordered`.
    pub fn build(self) -> Result<VerificationQuery<'a>> {
        let query = self.query;
        if query.negative {
            if let Some(name) = query.count.combinator_name() {
                return Err(MockError::negated(name));
            }
            if query.ordered {
                return Err(MockError::negated(Combinator::Ordered.name()));
            }
        }
        Ok(query)
    }
}

// ---------------------------------------------------------------------------
// HaveReceived
// ---------------------------------------------------------------------------

/// The `have_received` matcher: a query under construction, not yet bound
/// to a double or a polarity.
pub struct HaveReceived<'a> {
    method_name: String,
    pattern: Option<ArgumentPattern>,
    count: CountConstraint,
    combinators: Vec<Combinator>,
    callback: Option<VerifyCallback<'a>>,
}

/// Start a `have_received(method)` matcher.
pub fn have_received<'a>(method: impl Into<String>) -> HaveReceived<'a> {
    HaveReceived {
        method_name: method.into(),
        pattern: None,
        count: CountConstraint::Unconstrained,
        combinators: Vec::new(),
        callback: None,
    }
}

impl fmt::Debug for HaveReceived<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HaveReceived")
            .field("method_name", &self.method_name)
            .field("pattern", &self.pattern)
            .field("count", &self.count)
            .field("combinators", &self.combinators)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl<'a> HaveReceived<'a> {
    /// Constrain the expected arguments to this literal tuple.
    #[must_use]
    pub fn with<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ArgValue>,
    {
        self.pattern = Some(ArgumentPattern::literal(args));
        self
    }

    #[must_use]
    pub fn with_pattern(mut self, pattern: ArgumentPattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    fn push(mut self, combinator: Combinator, count: Option<CountConstraint>) -> Self {
        self.combinators.push(combinator);
        if let Some(count) = count {
            self.count = count;
        }
        self
    }

    #[must_use]
    pub fn exactly(self, n: impl Into<CountArg>) -> Self {
        let n = n.into().get();
        self.push(Combinator::Exactly, Some(CountConstraint::Exactly(n)))
    }

    #[must_use]
    pub fn at_least(self, n: impl Into<CountArg>) -> Self {
        let n = n.into().get();
        self.push(Combinator::AtLeast, Some(CountConstraint::AtLeast(n)))
    }

    #[must_use]
    pub fn at_most(self, n: impl Into<CountArg>) -> Self {
        let n = n.into().get();
        self.push(Combinator::AtMost, Some(CountConstraint::AtMost(n)))
    }

    /// Reads as `exactly(3).times()`; does not change the count.
    #[must_use]
    pub fn times(self) -> Self {
        self.push(Combinator::Times, None)
    }

    /// Reads as `exactly(1).time()`; does not change the count.
    #[must_use]
    pub fn time(self) -> Self {
        self.push(Combinator::Time, None)
    }

    #[must_use]
    pub fn once(self) -> Self {
        self.push(Combinator::Once, Some(CountConstraint::ONCE))
    }

    #[must_use]
    pub fn twice(self) -> Self {
        self.push(Combinator::Twice, Some(CountConstraint::TWICE))
    }

    #[must_use]
    pub fn thrice(self) -> Self {
        self.push(Combinator::Thrice, Some(CountConstraint::THRICE))
    }

    #[must_use]
    pub fn ordered(self) -> Self {
        self.push(Combinator::Ordered, None)
    }

    /// Invoke `callback` once per matched call.
    #[must_use]
    pub fn yielding(mut self, callback: impl FnMut(&[ArgValue], Option<&CallBlock>) + 'a) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Use `callback` only if no callback was attached with
    /// [`HaveReceived::yielding`].
    #[must_use]
    pub(crate) fn or_yielding(mut self, callback: VerifyCallback<'a>) -> Self {
        if self.callback.is_none() {
            self.callback = Some(callback);
        }
        self
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub const fn count(&self) -> CountConstraint {
        self.count
    }

    pub fn combinators(&self) -> &[Combinator] {
        &self.combinators
    }

    pub fn is_ordered(&self) -> bool {
        self.combinators.contains(&Combinator::Ordered)
    }

    /// `have received expected_method(:expected_args) 1 time`.
    ///
    /// Depends only on the matcher itself, never on session state.
    pub fn description(&self) -> String {
        let args = self
            .pattern
            .as_ref()
            .map(ArgumentPattern::describe)
            .unwrap_or_default();
        format!(
            "have received {}{args} {}",
            self.method_name,
            diagnostics::expected_count(self.count, false)
        )
    }

    /// Bind the matcher to `double` with the given polarity.
    ///
    /// A negated matcher fails with "can't use <combinator> when negative"
    /// naming the first count combinator (or `ordered`) that was chained.
    pub fn into_query(self, double: &DoubleRef, negative: bool) -> Result<VerificationQuery<'a>> {
        if negative {
            if let Some(first) = self.combinators.first() {
                return Err(MockError::negated(first.name()));
            }
        }
        Ok(VerificationQuery {
            double: double.clone(),
            ordered: self.is_ordered(),
            method_name: self.method_name,
            pattern: self.pattern,
            count: self.count,
            negative,
            callback: self.callback,
        })
    }
}
