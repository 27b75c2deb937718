//! Per-example verification session.
//!
//! A [`Session`] owns everything one test example records: the call ledger,
//! method configurations, null-object doubles, the default verification
//! chain and the verifier configuration. Clones share the same state, so the
//! interception layer and the assertion layer can each hold a handle.
//!
//! Locks are held only while reading or writing session state, never while
//! user code runs, so recording and verifying from inside a verification
//! callback is allowed.

use std::sync::Arc;

use fmock_error::Result;
use fmock_types::{
    ArgValue, Call, CallBlock, DoubleId, DoubleRef, SequenceNo, StubConfiguration, StubKind,
};
use parking_lot::Mutex;
use tracing::info;

use crate::config::VerifierConfig;
use crate::evaluator::{LedgerView, MethodSnapshot, VerificationResult, evaluate};
use crate::ledger::CallLedger;
use crate::order::{OrderTracker, SharedChain};
use crate::query::VerificationQuery;
use crate::stubs::StubRegistry;
use crate::target::{ExpectationTarget, TargetKind};

#[derive(Debug, Default)]
struct SessionState {
    ledger: CallLedger,
    stubs: StubRegistry,
    config: VerifierConfig,
}

/// Shared handle to the state of one test example.
#[derive(Debug, Clone, Default)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    chain: SharedChain,
}

impl Session {
    /// Session with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: VerifierConfig) -> Self {
        let session = Self::default();
        session.state.lock().config = config;
        session
    }

    /// Session configured from `FMOCK_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_config(VerifierConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> VerifierConfig {
        self.state.lock().config
    }

    // === Interception feed ===

    /// Record an intercepted call and return its sequence number.
    pub fn record_call(
        &self,
        double: &DoubleRef,
        method: &str,
        args: Vec<ArgValue>,
        block: Option<CallBlock>,
    ) -> SequenceNo {
        self.state.lock().ledger.append(double.id(), method, args, block)
    }

    // === Configuration feed ===

    /// Record that `method` was configured on `double`.
    pub fn configure_method(
        &self,
        double: &DoubleRef,
        method: &str,
        kind: StubKind,
    ) -> StubConfiguration {
        self.state.lock().stubs.configure(double.id(), method, kind)
    }

    /// Treat every method of `double` as stubbed.
    pub fn configure_null_object(&self, double: &DoubleRef) {
        self.state.lock().stubs.mark_null_object(double.id());
    }

    // === Verification ===

    /// Verify `query` against the session's own chain.
    pub fn verify(&self, query: VerificationQuery<'_>) -> Result<VerificationResult> {
        let config = self.config();
        let mut chain = self.chain.clone();
        evaluate(query, self, &mut chain, &config)
    }

    /// Verify `query` against an explicit chain.
    pub fn verify_in(
        &self,
        chain: &mut OrderTracker,
        query: VerificationQuery<'_>,
    ) -> Result<VerificationResult> {
        let config = self.config();
        evaluate(query, self, chain, &config)
    }

    /// `expect(double)`: the target for `to`/`not_to` assertions.
    #[must_use]
    pub fn expect(&self, double: &DoubleRef) -> ExpectationTarget<'_> {
        ExpectationTarget::new(self, double.clone(), TargetKind::Expect)
    }

    /// `allow(double)`; cannot verify received messages.
    #[must_use]
    pub fn allow(&self, double: &DoubleRef) -> ExpectationTarget<'_> {
        ExpectationTarget::new(self, double.clone(), TargetKind::Allow)
    }

    /// `allow_any_instance_of(double)`; cannot verify received messages.
    #[must_use]
    pub fn allow_any_instance_of(&self, double: &DoubleRef) -> ExpectationTarget<'_> {
        ExpectationTarget::new(self, double.clone(), TargetKind::AllowAnyInstanceOf)
    }

    /// `expect_any_instance_of(double)`; cannot verify received messages.
    #[must_use]
    pub fn expect_any_instance_of(&self, double: &DoubleRef) -> ExpectationTarget<'_> {
        ExpectationTarget::new(self, double.clone(), TargetKind::ExpectAnyInstanceOf)
    }

    // === Inspection ===

    /// Calls of `method` on `double`, in recording order.
    #[must_use]
    pub fn calls_for(&self, double: &DoubleRef, method: &str) -> Vec<Call> {
        LedgerView::calls_for(self, double.id(), method)
    }

    /// Total number of calls recorded in this example.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.state.lock().ledger.len()
    }

    // === Lifecycle ===

    /// Example teardown: drop every call, the sequence counter, all method
    /// configurations and null objects, and the session chain.
    ///
    /// Idempotent. Returns the number of discarded calls.
    pub fn reset(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.stubs.clear();
            state.ledger.reset()
        };
        self.chain.reset();
        info!(discarded, "fmock::reset");
        discarded
    }

    /// Forget one double's calls and configuration. The sequence counter
    /// keeps increasing.
    pub fn reset_double(&self, double: &DoubleRef) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.stubs.forget_double(double.id());
            state.ledger.forget_double(double.id())
        };
        info!(double = %double.id(), discarded, "fmock::reset");
        discarded
    }

    /// Start a new default verification chain.
    pub fn begin_chain(&self) {
        self.chain.reset();
    }
}

impl LedgerView for Session {
    fn stub_configuration(&self, double: DoubleId, method: &str) -> Option<StubConfiguration> {
        self.state.lock().stubs.find(double, method)
    }

    fn is_null_object(&self, double: DoubleId) -> bool {
        self.state.lock().stubs.is_null_object(double)
    }

    fn calls_for(&self, double: DoubleId, method: &str) -> Vec<Call> {
        self.state.lock().ledger.calls_for(double, method).to_vec()
    }

    fn method_snapshot(&self, double: DoubleId, method: &str) -> MethodSnapshot {
        let state = self.state.lock();
        MethodSnapshot {
            configuration: state.stubs.find(double, method),
            null_object: state.stubs.is_null_object(double),
            calls: state.ledger.calls_for(double, method).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::query::have_received;

    fn dbl(n: u64) -> DoubleRef {
        DoubleRef::named(DoubleId::new(n).unwrap(), "double")
    }

    #[test]
    fn clones_share_state() {
        let session = Session::new();
        let feed = session.clone();
        let d = dbl(1);
        feed.configure_method(&d, "foo", StubKind::Stub);
        feed.record_call(&d, "foo", vec![ArgValue::Integer(1)], None);
        assert_eq!(session.call_count(), 1);
        assert_eq!(session.calls_for(&d, "foo")[0].args, vec![ArgValue::Integer(1)]);
    }

    #[test]
    fn reset_clears_calls_counter_and_configuration() {
        let session = Session::new();
        let d = dbl(1);
        session.configure_method(&d, "foo", StubKind::Stub);
        session.record_call(&d, "foo", vec![], None);
        session.record_call(&d, "foo", vec![], None);
        assert_eq!(session.reset(), 2);
        assert_eq!(session.reset(), 0);

        let err = session
            .verify(have_received("foo").into_query(&d, false).unwrap())
            .unwrap_err();
        assert!(err.is_configuration_error());

        session.configure_method(&d, "foo", StubKind::Stub);
        let result = session
            .verify(have_received("foo").into_query(&d, false).unwrap())
            .unwrap();
        assert!(!result.passed);
        assert!(result.diagnostic.unwrap().contains("received: 0 times"));
        assert_eq!(session.record_call(&d, "foo", vec![], None).get(), 1);
    }

    #[test]
    fn method_snapshot_reads_one_consistent_view() {
        let session = Session::new();
        let d = dbl(1);
        session.configure_method(&d, "foo", StubKind::Stub);
        session.record_call(&d, "foo", vec![ArgValue::Integer(1)], None);

        let snapshot = session.method_snapshot(d.id(), "foo");
        assert!(snapshot.configuration.is_some_and(StubConfiguration::is_verifiable));
        assert!(!snapshot.null_object);
        assert_eq!(snapshot.calls.len(), 1);

        session.reset();
        let snapshot = session.method_snapshot(d.id(), "foo");
        assert!(snapshot.configuration.is_none());
        assert!(snapshot.calls.is_empty());

        session.configure_null_object(&d);
        assert!(session.method_snapshot(d.id(), "foo").null_object);
    }

    #[test]
    fn reset_double_keeps_counter() {
        let session = Session::new();
        let a = dbl(1);
        let b = dbl(2);
        session.configure_method(&a, "foo", StubKind::Stub);
        session.record_call(&a, "foo", vec![], None);
        session.record_call(&b, "foo", vec![], None);
        assert_eq!(session.reset_double(&a), 1);
        assert!(session.calls_for(&a, "foo").is_empty());
        assert_eq!(session.calls_for(&b, "foo").len(), 1);
        assert!(session.stub_configuration(a.id(), "foo").is_none());
        assert_eq!(session.record_call(&a, "foo", vec![], None).get(), 3);
    }

    #[test]
    fn callback_may_record_and_verify_reentrantly() {
        let session = Session::new();
        let d = dbl(1);
        session.configure_method(&d, "outer", StubKind::Stub);
        session.configure_method(&d, "inner", StubKind::Stub);
        session.record_call(&d, "outer", vec![], None);

        let nested_passed = Cell::new(false);
        let query = have_received("outer")
            .yielding(|_, _| {
                session.record_call(&d, "inner", vec![], None);
                let inner = session
                    .verify(have_received("inner").ordered().into_query(&d, false).unwrap())
                    .unwrap();
                nested_passed.set(inner.passed);
            })
            .into_query(&d, false)
            .unwrap();
        assert!(session.verify(query).unwrap().passed);
        assert!(nested_passed.get());
        assert_eq!(session.call_count(), 2);
    }

    #[test]
    fn explicit_chain_is_independent() {
        let session = Session::new();
        let d = dbl(1);
        session.configure_method(&d, "one", StubKind::Stub);
        session.configure_method(&d, "two", StubKind::Stub);
        session.record_call(&d, "two", vec![], None);
        session.record_call(&d, "one", vec![], None);

        let ordered = |m: &str| have_received(m).ordered().into_query(&d, false).unwrap();

        let mut chain = OrderTracker::new();
        assert!(session.verify_in(&mut chain, ordered("one")).unwrap().passed);
        assert!(!session.verify_in(&mut chain, ordered("two")).unwrap().passed);

        // The session's own chain never saw the explicit one.
        assert!(session.verify(ordered("two")).unwrap().passed);
        assert!(session.verify(ordered("one")).unwrap().passed);

        session.begin_chain();
        assert!(session.verify(ordered("one")).unwrap().passed);
    }

    #[test]
    fn config_is_applied() {
        let session = Session::with_config(VerifierConfig {
            ordered_vague_counts: false,
            diff_single_call: true,
        });
        let d = dbl(1);
        session.configure_method(&d, "one", StubKind::Stub);
        let err = session
            .verify(
                have_received("one")
                    .at_most(2)
                    .times()
                    .ordered()
                    .into_query(&d, false)
                    .unwrap(),
            )
            .unwrap_err();
        assert!(err.is_usage_error());
        assert!(!session.config().ordered_vague_counts);
    }
}
