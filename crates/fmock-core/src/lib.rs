pub mod config;
pub mod diagnostics;
pub mod evaluator;
pub mod ledger;
pub mod matcher;
pub mod order;
pub mod query;
pub mod session;
pub mod stubs;
pub mod target;

pub use config::VerifierConfig;
pub use diagnostics::FailureKind;
pub use evaluator::{
    LedgerSnapshot, LedgerView, MatchGroup, MethodSnapshot, VerificationResult, evaluate,
    group_calls,
};
pub use ledger::CallLedger;
pub use matcher::{
    ArgsPredicate, ArgumentPattern, FnPredicate, Positional, ValueMatcher, canonical_signature,
};
pub use order::{OrderChain, OrderCheck, OrderTracker, SharedChain};
pub use query::{
    Combinator, HaveReceived, QueryBuilder, VerificationQuery, VerifyCallback, have_received,
};
pub use session::Session;
pub use stubs::StubRegistry;
pub use target::{ExpectationTarget, TargetKind};
