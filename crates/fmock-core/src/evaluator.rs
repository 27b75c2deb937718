//! Constraint evaluation.
//!
//! [`evaluate`] runs one [`VerificationQuery`] against a [`LedgerView`]:
//! configuration checks, argument filtering, callback invocation, the
//! count decision, grouping, the ordered check and, on failure, the
//! diagnostic.
//!
//! # Reentrancy
//!
//! The view hands out owned snapshots of calls, and the chain is only
//! touched after every callback has returned. A callback may therefore
//! record further calls or run nested verifications against the same
//! session.

use fmock_error::{MockError, Result};
use fmock_types::{Call, DoubleId, StubConfiguration, StubKind};
use tracing::debug;

use crate::config::VerifierConfig;
use crate::diagnostics::{self, FailureKind};
use crate::ledger::CallLedger;
use crate::matcher::{self, canonical_signature};
use crate::order::{OrderChain, OrderCheck, consumed_calls};
use crate::query::VerificationQuery;
use crate::stubs::StubRegistry;

// ---------------------------------------------------------------------------
// Ledger access
// ---------------------------------------------------------------------------

/// Read access to the recorded state the evaluator needs.
pub trait LedgerView {
    /// Configuration of `method` on `double`, if it was ever configured.
    fn stub_configuration(&self, double: DoubleId, method: &str) -> Option<StubConfiguration>;

    /// Whether every method of `double` is implicitly stubbed.
    fn is_null_object(&self, double: DoubleId) -> bool;

    /// Calls of `method` on `double` in sequence order, as an owned snapshot.
    fn calls_for(&self, double: DoubleId, method: &str) -> Vec<Call>;

    /// Everything one evaluation reads, taken as a single consistent view.
    ///
    /// Views backed by shared state override this to read under one lock.
    fn method_snapshot(&self, double: DoubleId, method: &str) -> MethodSnapshot {
        MethodSnapshot {
            configuration: self.stub_configuration(double, method),
            null_object: self.is_null_object(double),
            calls: self.calls_for(double, method),
        }
    }
}

/// Recorded state of one (double, method) pair at evaluation time.
#[derive(Debug, Clone, Default)]
pub struct MethodSnapshot {
    pub configuration: Option<StubConfiguration>,
    pub null_object: bool,
    pub calls: Vec<Call>,
}

/// Borrowed ledger and registry, for callers that own both directly.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSnapshot<'a> {
    pub ledger: &'a CallLedger,
    pub stubs: &'a StubRegistry,
}

impl LedgerView for LedgerSnapshot<'_> {
    fn stub_configuration(&self, double: DoubleId, method: &str) -> Option<StubConfiguration> {
        self.stubs.find(double, method)
    }

    fn is_null_object(&self, double: DoubleId) -> bool {
        self.stubs.is_null_object(double)
    }

    fn calls_for(&self, double: DoubleId, method: &str) -> Vec<Call> {
        self.ledger.calls_for(double, method).to_vec()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Calls sharing one canonical argument signature.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchGroup {
    pub signature: String,
    pub calls: Vec<Call>,
    pub first_seen_seq: u64,
}

impl MatchGroup {
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.len()
    }
}

/// Group `calls` by canonical signature, in first-occurrence order.
#[must_use]
pub fn group_calls(calls: &[Call]) -> Vec<MatchGroup> {
    let mut groups: Vec<MatchGroup> = Vec::new();
    for call in calls {
        let signature = canonical_signature(&call.args);
        match groups.iter_mut().find(|g| g.signature == signature) {
            Some(group) => group.calls.push(call.clone()),
            None => groups.push(MatchGroup {
                signature,
                calls: vec![call.clone()],
                first_seen_seq: call.sequence_no.get(),
            }),
        }
    }
    groups
}

/// Outcome of one verification.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct VerificationResult {
    pub passed: bool,
    pub matched_calls: Vec<Call>,
    pub groups: Vec<MatchGroup>,
    pub diagnostic: Option<String>,
    pub failure: Option<FailureKind>,
}

impl VerificationResult {
    #[must_use]
    pub fn actual_count(&self) -> usize {
        self.matched_calls.len()
    }

    /// `Ok(self)` when passed, otherwise
    /// [`MockError::ExpectationNotMet`] carrying the diagnostic.
    pub fn into_result(self) -> Result<Self> {
        if self.passed {
            return Ok(self);
        }
        match self.diagnostic {
            Some(diagnostic) => Err(MockError::expectation_not_met(diagnostic)),
            None => Err(MockError::internal("failed verification without diagnostic")),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn check_stubbed(query: &VerificationQuery<'_>, snapshot: &MethodSnapshot) -> Result<()> {
    let double = query.double();
    match snapshot.configuration {
        Some(config) if config.kind == StubKind::MockExpectation => {
            Err(MockError::mocked(double.inspect(), query.method_name()))
        }
        Some(config) if config.is_verifiable() => Ok(()),
        None if snapshot.null_object => Ok(()),
        _ => Err(MockError::not_stubbed(double.inspect(), query.method_name())),
    }
}

/// Evaluate `query` against `view`, checking order against `chain` when the
/// query is ordered.
///
/// Configuration and usage problems are returned as errors before any call
/// is read. A failed assertion is an `Ok` result with `passed == false`;
/// use [`VerificationResult::into_result`] to turn it into an error.
/// Panics raised by the query callback propagate unchanged.
pub fn evaluate(
    mut query: VerificationQuery<'_>,
    view: &impl LedgerView,
    chain: &mut impl OrderChain,
    config: &VerifierConfig,
) -> Result<VerificationResult> {
    query.check_config(config)?;
    let snapshot = view.method_snapshot(query.double().id(), query.method_name());
    check_stubbed(&query, &snapshot)?;

    let received = snapshot.calls;
    let matched_calls: Vec<Call> = received
        .iter()
        .filter(|call| matcher::matches(query.pattern(), &call.args))
        .cloned()
        .collect();

    if let Some(callback) = query.callback.as_mut() {
        for call in &matched_calls {
            callback(&call.args, call.block.as_ref());
        }
    }

    let actual = matched_calls.len();
    let mut passed = query.count().admits(actual, query.is_negative());
    let groups = group_calls(&matched_calls);

    let mut failure = None;
    if passed && query.is_ordered() {
        let consumed = consumed_calls(query.count(), &matched_calls);
        if let OrderCheck::OutOfOrder { .. } = chain.check_order(query.method_name(), consumed) {
            passed = false;
            failure = Some(FailureKind::OutOfOrder);
        }
    }
    if !passed && failure.is_none() {
        let unexpected_arguments = query.pattern().is_some()
            && !query.is_negative()
            && actual == 0
            && !received.is_empty();
        failure = Some(if unexpected_arguments {
            FailureKind::UnexpectedArguments
        } else {
            FailureKind::Count
        });
    }

    let diagnostic =
        failure.map(|kind| diagnostics::format(&query, kind, actual, &received, config));

    debug!(
        double = %query.double().id(),
        method = query.method_name(),
        matched = actual,
        passed,
        ordered = query.is_ordered(),
        negative = query.is_negative(),
        "fmock::verify"
    );

    Ok(VerificationResult {
        passed,
        matched_calls,
        groups,
        diagnostic,
        failure,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use fmock_types::{ArgValue, DoubleRef};

    use super::*;
    use crate::matcher::{ArgumentPattern, FnPredicate};
    use crate::order::OrderTracker;
    use crate::query::have_received;

    struct Fixture {
        ledger: CallLedger,
        stubs: StubRegistry,
        chain: OrderTracker,
        config: VerifierConfig,
        dbl: DoubleRef,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ledger: CallLedger::new(),
                stubs: StubRegistry::new(),
                chain: OrderTracker::new(),
                config: VerifierConfig::default(),
                dbl: DoubleRef::named(DoubleId::new(1).unwrap(), "double"),
            }
        }

        fn stub(&mut self, method: &str) {
            self.stubs.configure(self.dbl.id(), method, StubKind::Stub);
        }

        fn call(&mut self, method: &str, args: Vec<ArgValue>) {
            self.ledger.append(self.dbl.id(), method, args, None);
        }

        fn verify(&mut self, query: VerificationQuery<'_>) -> Result<VerificationResult> {
            let view = LedgerSnapshot {
                ledger: &self.ledger,
                stubs: &self.stubs,
            };
            evaluate(query, &view, &mut self.chain, &self.config)
        }

        fn query<'a>(&self, matcher: crate::query::HaveReceived<'a>) -> VerificationQuery<'a> {
            matcher.into_query(&self.dbl, false).unwrap()
        }
    }

    fn sym(s: &str) -> ArgValue {
        ArgValue::sym(s)
    }

    #[test]
    fn unstubbed_method_is_a_configuration_error() {
        let mut fx = Fixture::new();
        let query = fx.query(have_received("expected_method").twice().ordered());
        let err = fx.verify(query).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("method has not been stubbed"));
    }

    #[test]
    fn mocked_method_is_a_configuration_error() {
        let mut fx = Fixture::new();
        fx.stubs
            .configure(fx.dbl.id(), "expected_method", StubKind::MockExpectation);
        fx.call("expected_method", vec![]);
        let query = fx.query(have_received("expected_method"));
        let err = fx.verify(query).unwrap_err();
        assert!(
            err.to_string()
                .contains("method has been mocked instead of stubbed")
        );
    }

    #[test]
    fn null_object_is_implicitly_stubbed() {
        let mut fx = Fixture::new();
        fx.stubs.mark_null_object(fx.dbl.id());
        let query = fx.query(have_received("anything"));
        let result = fx.verify(query).unwrap();
        assert!(!result.passed);
        assert!(result.diagnostic.unwrap().contains("expected: 1 time"));

        fx.call("anything", vec![]);
        let query = fx.query(have_received("anything"));
        assert!(fx.verify(query).unwrap().passed);
    }

    #[test]
    fn filters_and_counts_matching_calls() {
        let mut fx = Fixture::new();
        fx.stub("expected_method");
        fx.call("expected_method", vec![sym("one")]);
        fx.call("expected_method", vec![sym("two")]);
        fx.call("expected_method", vec![sym("one")]);

        let q = fx.query(have_received("expected_method").with([sym("one")]).twice());
        let result = fx.verify(q).unwrap();
        assert!(result.passed);
        assert_eq!(result.actual_count(), 2);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].signature, ":one");
        assert_eq!(result.groups[0].first_seen_seq, 1);

        let q = fx.query(have_received("expected_method").with([sym("one")]).once());
        let result = fx.verify(q).unwrap();
        assert!(!result.passed);
        assert_eq!(result.failure, Some(FailureKind::Count));
        let text = result.diagnostic.unwrap();
        assert!(text.contains("expected: 1 time"), "{text}");
        assert!(text.contains("received: 2 times"), "{text}");
    }

    #[test]
    fn no_match_with_received_calls_reports_unexpected_arguments() {
        let mut fx = Fixture::new();
        fx.stub("expected_method");
        fx.call("expected_method", vec![sym("one")]);
        fx.call("expected_method", vec![sym("two")]);
        fx.call("expected_method", vec![sym("one")]);

        let q = fx.query(have_received("expected_method").with([sym("three")]).once());
        let result = fx.verify(q).unwrap();
        assert_eq!(result.failure, Some(FailureKind::UnexpectedArguments));
        assert!(result.groups.is_empty());
        let text = result.diagnostic.unwrap();
        assert!(text.contains("expected: (:three)"), "{text}");
        assert!(text.contains("got: (:one) (2 times)"), "{text}");
        assert!(text.contains("(:two) (1 time)"), "{text}");
    }

    #[test]
    fn negative_query_uses_count_message() {
        let mut fx = Fixture::new();
        fx.stub("expected_method");
        fx.call("expected_method", vec![sym("expected"), sym("args")]);

        let q = have_received("expected_method")
            .with([sym("unexpected"), sym("args")])
            .into_query(&fx.dbl, true)
            .unwrap();
        assert!(fx.verify(q).unwrap().passed);

        let q = have_received("expected_method")
            .with([sym("expected"), sym("args")])
            .into_query(&fx.dbl, true)
            .unwrap();
        let result = fx.verify(q).unwrap();
        assert_eq!(result.failure, Some(FailureKind::Count));
        let text = result.diagnostic.unwrap();
        assert!(text.contains("expected: 0 times"), "{text}");
        assert!(text.contains("received: 1 time"), "{text}");
    }

    #[test]
    fn callback_sees_each_matched_call_in_order() {
        let mut fx = Fixture::new();
        fx.stub("foo");
        fx.call("foo", vec![ArgValue::Integer(1)]);
        fx.call("foo", vec![ArgValue::Integer(2)]);
        fx.call("foo", vec![ArgValue::Integer(3)]);

        let seen = RefCell::new(Vec::new());
        let odd = FnPredicate::new("odd", |args: &[ArgValue]| {
            args.first()
                .and_then(ArgValue::as_integer)
                .is_some_and(|i| i % 2 == 1)
        });
        let q = fx.query(
            have_received("foo")
                .with_pattern(ArgumentPattern::predicate(odd))
                .yielding(|args, _| seen.borrow_mut().push(args.to_vec())),
        );
        assert!(fx.verify(q).unwrap().passed);
        assert_eq!(
            seen.into_inner(),
            vec![vec![ArgValue::Integer(1)], vec![ArgValue::Integer(3)]]
        );
    }

    #[test]
    #[should_panic(expected = "left: Integer(43)")]
    fn callback_panic_propagates() {
        let mut fx = Fixture::new();
        fx.stub("foo");
        fx.call("foo", vec![ArgValue::Integer(43)]);
        let q = fx.query(have_received("foo").yielding(|args, _| {
            assert_eq!(args[0], ArgValue::Integer(42));
        }));
        let _ = fx.verify(q);
    }

    #[test]
    fn callback_panic_stops_remaining_invocations() {
        let mut fx = Fixture::new();
        fx.stub("foo");
        fx.call("foo", vec![ArgValue::Integer(1)]);
        fx.call("foo", vec![ArgValue::Integer(2)]);
        fx.call("foo", vec![ArgValue::Integer(3)]);

        let invocations = Cell::new(0);
        let q = fx.query(have_received("foo").thrice().ordered().yielding(|_, _| {
            invocations.set(invocations.get() + 1);
            panic!("callback rejected the call");
        }));
        let outcome = catch_unwind(AssertUnwindSafe(|| fx.verify(q)));
        assert!(outcome.is_err());
        assert_eq!(invocations.get(), 1);
        assert_eq!(fx.chain.last_consumed(), None);
    }

    #[test]
    fn ordered_failure_overrides_pass() {
        let mut fx = Fixture::new();
        fx.stub("one");
        fx.stub("two");
        fx.call("one", vec![]);
        fx.call("two", vec![]);
        fx.call("one", vec![]);

        let q = fx.query(have_received("one").twice().ordered());
        assert!(fx.verify(q).unwrap().passed);
        let q = fx.query(have_received("two").once().ordered());
        let result = fx.verify(q).unwrap();
        assert!(!result.passed);
        assert_eq!(result.failure, Some(FailureKind::OutOfOrder));
        assert_eq!(
            result.diagnostic.as_deref(),
            Some("#<Double \"double\"> received :two out of order")
        );
        assert!(result.into_result().unwrap_err().is_assertion_failure());
    }

    #[test]
    fn ordered_count_failure_does_not_touch_chain() {
        let mut fx = Fixture::new();
        fx.stub("one");
        fx.call("one", vec![]);
        let q = fx.query(have_received("one").twice().ordered());
        let result = fx.verify(q).unwrap();
        assert_eq!(result.failure, Some(FailureKind::Count));
        assert_eq!(fx.chain.last_consumed(), None);
    }

    #[test]
    fn strict_config_rejects_vague_ordered_counts_before_lookup() {
        let mut fx = Fixture::new();
        fx.config.ordered_vague_counts = false;
        // Not stubbed either; the usage error wins.
        let q = fx.query(have_received("one").at_least(1).times().ordered());
        let err = fx.verify(q).unwrap_err();
        assert_eq!(err.to_string(), "can't use at_least with ordered");
    }

    /// View that only answers whole-method snapshots.
    struct SnapshotOnly {
        snapshot: MethodSnapshot,
        reads: Cell<usize>,
    }

    impl LedgerView for SnapshotOnly {
        fn stub_configuration(&self, _: DoubleId, _: &str) -> Option<StubConfiguration> {
            panic!("configuration read outside the snapshot");
        }

        fn is_null_object(&self, _: DoubleId) -> bool {
            panic!("null-object flag read outside the snapshot");
        }

        fn calls_for(&self, _: DoubleId, _: &str) -> Vec<Call> {
            panic!("calls read outside the snapshot");
        }

        fn method_snapshot(&self, _: DoubleId, _: &str) -> MethodSnapshot {
            self.reads.set(self.reads.get() + 1);
            self.snapshot.clone()
        }
    }

    #[test]
    fn evaluation_reads_state_through_one_snapshot() {
        let dbl = DoubleRef::named(DoubleId::new(1).unwrap(), "double");
        let call = Call {
            double_id: dbl.id(),
            method_name: "foo".to_owned(),
            args: vec![sym("one")],
            block: None,
            sequence_no: fmock_types::SequenceNo::new(1),
        };
        let view = SnapshotOnly {
            snapshot: MethodSnapshot {
                configuration: Some(StubConfiguration::new(StubKind::Stub)),
                null_object: false,
                calls: vec![call],
            },
            reads: Cell::new(0),
        };
        let query = have_received("foo")
            .with([sym("two")])
            .into_query(&dbl, false)
            .unwrap();
        let mut chain = OrderTracker::new();
        let result = evaluate(query, &view, &mut chain, &VerifierConfig::default()).unwrap();
        assert_eq!(result.failure, Some(FailureKind::UnexpectedArguments));
        assert_eq!(view.reads.get(), 1);
    }

    #[test]
    fn group_calls_keeps_first_occurrence_order() {
        let calls: Vec<Call> = [
            vec![sym("one"), sym("four")],
            vec![sym("two"), sym("four")],
            vec![sym("three"), sym("four")],
            vec![sym("one"), sym("four")],
            vec![sym("three"), sym("four")],
            vec![sym("three"), sym("four")],
        ]
        .into_iter()
        .enumerate()
        .map(|(i, args)| Call {
            double_id: DoubleId::new(1).unwrap(),
            method_name: "m".to_owned(),
            args,
            block: None,
            sequence_no: fmock_types::SequenceNo::new(i as u64 + 1),
        })
        .collect();
        let groups = group_calls(&calls);
        let summary: Vec<(&str, usize, u64)> = groups
            .iter()
            .map(|g| (g.signature.as_str(), g.count(), g.first_seen_seq))
            .collect();
        assert_eq!(
            summary,
            vec![
                (":one, :four", 2, 1),
                (":two, :four", 1, 2),
                (":three, :four", 3, 3),
            ]
        );
    }

    #[test]
    fn into_result_passes_through() {
        let mut fx = Fixture::new();
        fx.stub("m");
        fx.call("m", vec![]);
        let q = fx.query(have_received("m"));
        let result = fx.verify(q).unwrap().into_result().unwrap();
        assert_eq!(result.actual_count(), 1);
        assert_eq!(result.failure, None);
        assert_eq!(result.diagnostic, None);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn prop_unconstrained_passes_iff_called(calls in 0_usize..6) {
                let mut fx = Fixture::new();
                fx.stub("m");
                for _ in 0..calls {
                    fx.call("m", vec![]);
                }
                let q = fx.query(have_received("m"));
                prop_assert_eq!(fx.verify(q).unwrap().passed, calls >= 1);
            }

            #[test]
            fn prop_exactly_passes_iff_equal(calls in 0_usize..6, n in 0_usize..6) {
                let mut fx = Fixture::new();
                fx.stub("m");
                for _ in 0..calls {
                    fx.call("m", vec![]);
                }
                let q = fx.query(have_received("m").exactly(n).times());
                let result = fx.verify(q).unwrap();
                prop_assert_eq!(result.passed, calls == n);
                prop_assert_eq!(result.diagnostic.is_some(), calls != n);
            }

            #[test]
            fn prop_at_least_and_at_most(calls in 0_usize..6, n in 0_usize..6) {
                let mut fx = Fixture::new();
                fx.stub("m");
                for _ in 0..calls {
                    fx.call("m", vec![]);
                }
                let q = fx.query(have_received("m").at_least(n).times());
                prop_assert_eq!(fx.verify(q).unwrap().passed, calls >= n);
                let q = fx.query(have_received("m").at_most(n).times());
                prop_assert_eq!(fx.verify(q).unwrap().passed, calls <= n);
            }

            #[test]
            fn prop_groups_partition_matched_calls(
                picks in prop::collection::vec(0_usize..3, 0..12),
            ) {
                let mut fx = Fixture::new();
                fx.stub("m");
                let names = ["a", "b", "c"];
                for pick in &picks {
                    fx.call("m", vec![sym(names[*pick])]);
                }
                let q = fx.query(have_received("m").with_pattern(ArgumentPattern::AnyArgs));
                let result = fx.verify(q).unwrap();
                let total: usize = result.groups.iter().map(MatchGroup::count).sum();
                prop_assert_eq!(total, picks.len());
                let firsts: Vec<u64> = result.groups.iter().map(|g| g.first_seen_seq).collect();
                let mut sorted = firsts.clone();
                sorted.sort_unstable();
                prop_assert_eq!(firsts, sorted);
            }
        }
    }
}
