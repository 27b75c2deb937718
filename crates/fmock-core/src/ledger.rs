//! Per-example call ledger.
//!
//! Append-only store of intercepted calls keyed by (double, method). Every
//! append draws the next value of one example-wide sequence counter, so
//! sequence numbers are strictly increasing across all doubles and methods.
//! The ledger is cleared (calls and counter) by [`CallLedger::reset`] at
//! example teardown.

use std::collections::HashMap;

use fmock_types::{ArgValue, Call, CallBlock, DoubleId, SequenceNo};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LedgerKey {
    double: DoubleId,
    method: String,
}

impl LedgerKey {
    fn new(double: DoubleId, method: &str) -> Self {
        Self {
            double,
            method: method.to_owned(),
        }
    }
}

/// Recorded calls for the current example.
#[derive(Debug, Default)]
pub struct CallLedger {
    calls: HashMap<LedgerKey, Vec<Call>>,
    last_seq: u64,
    len: usize,
}

impl CallLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and return the sequence number assigned to it.
    ///
    /// The counter is advanced before the call is stored, so the first call
    /// of an example is `#1`.
    pub fn append(
        &mut self,
        double_id: DoubleId,
        method_name: &str,
        args: Vec<ArgValue>,
        block: Option<CallBlock>,
    ) -> SequenceNo {
        self.last_seq += 1;
        let sequence_no = SequenceNo::new(self.last_seq);
        debug!(
            double = %double_id,
            method = method_name,
            seq = sequence_no.get(),
            argc = args.len(),
            "fmock::record_call"
        );
        self.calls
            .entry(LedgerKey::new(double_id, method_name))
            .or_default()
            .push(Call {
                double_id,
                method_name: method_name.to_owned(),
                args,
                block,
                sequence_no,
            });
        self.len += 1;
        sequence_no
    }

    /// Calls of `method_name` on `double_id`, in recording order.
    #[must_use]
    pub fn calls_for(&self, double_id: DoubleId, method_name: &str) -> &[Call] {
        self.calls
            .get(&LedgerKey::new(double_id, method_name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of calls recorded in this example.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sequence number of the most recent call, if any.
    #[must_use]
    pub const fn last_seq(&self) -> Option<SequenceNo> {
        if self.last_seq == 0 {
            None
        } else {
            Some(SequenceNo::new(self.last_seq))
        }
    }

    /// Drop every call recorded against `double_id`.
    ///
    /// The sequence counter is left untouched, so later calls still sort
    /// after everything recorded before. Returns the number of dropped calls.
    pub fn forget_double(&mut self, double_id: DoubleId) -> usize {
        let mut dropped = 0;
        self.calls.retain(|key, calls| {
            if key.double == double_id {
                dropped += calls.len();
                false
            } else {
                true
            }
        });
        self.len -= dropped;
        dropped
    }

    /// Clear all calls and the sequence counter. Idempotent.
    ///
    /// Returns the number of discarded calls.
    pub fn reset(&mut self) -> usize {
        let dropped = self.len;
        self.calls.clear();
        self.last_seq = 0;
        self.len = 0;
        dropped
    }
}
