//! Order tracking for `ordered` verification chains.
//!
//! A chain is the sequence of ordered assertions a test author issues
//! against one logical flow. Each ordered assertion consumes some of its
//! matched calls; the earliest of them must come after the latest call
//! consumed by any earlier assertion in the same chain. Re-asserting calls
//! the chain has already consumed is a no-op.

use std::collections::HashSet;
use std::sync::Arc;

use fmock_types::{Call, CountConstraint, SequenceNo};
use parking_lot::Mutex;
use tracing::warn;

// ---------------------------------------------------------------------------
// Consumption policy
// ---------------------------------------------------------------------------

/// Calls an ordered assertion consumes from its matched calls.
///
/// `Exactly(n)` consumes the first `n` matched calls in sequence order;
/// every other constraint consumes all of them.
#[must_use]
pub fn consumed_calls(count: CountConstraint, matched: &[Call]) -> &[Call] {
    match count {
        CountConstraint::Exactly(n) => &matched[..n.min(matched.len())],
        CountConstraint::Unconstrained
        | CountConstraint::AtLeast(_)
        | CountConstraint::AtMost(_) => matched,
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Outcome of one ordered check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderCheck {
    /// The assertion is in order; the chain advanced to `last_consumed`
    /// (unchanged when nothing new was consumed).
    InOrder { last_consumed: Option<SequenceNo> },
    /// The earliest newly consumed call precedes the chain's high-water mark.
    OutOfOrder {
        min_seq: SequenceNo,
        last_consumed: SequenceNo,
    },
}

impl OrderCheck {
    #[must_use]
    pub const fn passed(self) -> bool {
        matches!(self, Self::InOrder { .. })
    }
}

/// State of one verification chain.
#[derive(Debug, Clone, Default)]
pub struct OrderTracker {
    last_consumed: Option<SequenceNo>,
    consumed: HashSet<SequenceNo>,
}

impl OrderTracker {
    /// Fresh chain whose high-water mark lies below every real call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest sequence number consumed so far in this chain.
    #[must_use]
    pub const fn last_consumed(&self) -> Option<SequenceNo> {
        self.last_consumed
    }

    /// Check `group` (the calls an assertion consumes) against the chain.
    ///
    /// A group made only of calls an earlier assertion already consumed is
    /// in order and leaves the chain where it is. Otherwise the earliest call
    /// of the whole group must come after the chain's high-water mark. On
    /// success the chain advances to the latest call of the group; on
    /// failure it is left untouched.
    pub fn check(&mut self, method: &str, group: &[Call]) -> OrderCheck {
        if group.iter().all(|call| self.consumed.contains(&call.sequence_no)) {
            return OrderCheck::InOrder {
                last_consumed: self.last_consumed,
            };
        }

        let seqs = group.iter().map(|call| call.sequence_no);
        let (Some(min_seq), Some(max_seq)) = (seqs.clone().min(), seqs.max()) else {
            return OrderCheck::InOrder {
                last_consumed: self.last_consumed,
            };
        };

        if let Some(last_consumed) = self.last_consumed.filter(|last| min_seq <= *last) {
            warn!(
                method,
                min_seq = min_seq.get(),
                last_consumed = last_consumed.get(),
                "fmock::out_of_order"
            );
            return OrderCheck::OutOfOrder {
                min_seq,
                last_consumed,
            };
        }

        self.consumed.extend(group.iter().map(|call| call.sequence_no));
        self.last_consumed = Some(max_seq);
        OrderCheck::InOrder {
            last_consumed: self.last_consumed,
        }
    }

    /// Start a new chain.
    pub fn reset(&mut self) {
        self.last_consumed = None;
        self.consumed.clear();
    }
}

// ---------------------------------------------------------------------------
// Chain access for the evaluator
// ---------------------------------------------------------------------------

/// Access to the chain an ordered query is checked against.
///
/// The evaluator calls [`OrderChain::check_order`] at most once per query
/// and never while a user callback is running.
pub trait OrderChain {
    fn check_order(&mut self, method: &str, group: &[Call]) -> OrderCheck;
}

impl OrderChain for OrderTracker {
    fn check_order(&mut self, method: &str, group: &[Call]) -> OrderCheck {
        self.check(method, group)
    }
}

/// Chain shared between clones of a session.
///
/// The lock is held only for the duration of one check, so assertions issued
/// from inside a verification callback can use the same chain.
#[derive(Debug, Clone, Default)]
pub struct SharedChain(Arc<Mutex<OrderTracker>>);

impl SharedChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.0.lock().reset();
    }

    #[must_use]
    pub fn last_consumed(&self) -> Option<SequenceNo> {
        self.0.lock().last_consumed()
    }
}

impl OrderChain for SharedChain {
    fn check_order(&mut self, method: &str, group: &[Call]) -> OrderCheck {
        self.0.lock().check(method, group)
    }
}
