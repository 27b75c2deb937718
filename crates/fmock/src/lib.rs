//! Public API facade for frankenmock.
//!
//! frankenmock records the calls made to test doubles during one test
//! example and verifies `have_received`-style assertions against them:
//! argument patterns, call counts, cross-call ordering, and failure
//! diagnostics.
//!
//! ```
//! use fmock::{ArgValue, DoubleId, DoubleRef, Session, StubKind, have_received};
//!
//! let session = Session::new();
//! let dbl = DoubleRef::named(DoubleId::new(1).unwrap(), "double");
//! session.configure_method(&dbl, "expected_method", StubKind::Stub);
//! session.record_call(&dbl, "expected_method", vec![ArgValue::sym("one")], None);
//!
//! session
//!     .expect(&dbl)
//!     .to(have_received("expected_method").with([ArgValue::sym("one")]).once())
//!     .unwrap();
//! ```

pub mod logging;

pub use fmock_core::{
    ArgsPredicate, ArgumentPattern, CallLedger, Combinator, ExpectationTarget, FailureKind,
    FnPredicate, HaveReceived, LedgerSnapshot, LedgerView, MatchGroup, MethodSnapshot, OrderChain,
    OrderCheck, OrderTracker, Positional, QueryBuilder, Session, SharedChain, StubRegistry,
    TargetKind, ValueMatcher, VerificationQuery, VerificationResult, VerifierConfig,
    VerifyCallback, canonical_signature, evaluate, group_calls, have_received,
};
pub use fmock_error::{ErrorCategory, MockError, Result};
pub use fmock_types::{
    ArgValue, Call, CallBlock, CountArg, CountConstraint, DoubleId, DoubleRef, SequenceNo,
    StubConfiguration, StubKind, ValueKind, args,
};
