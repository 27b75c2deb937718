//! Method configuration registry.
//!
//! Records, per (double, method), whether the method was configured as a
//! plain stub or as a mock expectation, and which doubles are null objects
//! (every method implicitly stubbed). The verification engine consults it
//! before touching the ledger.

use std::collections::{HashMap, HashSet};

use fmock_types::{DoubleId, StubConfiguration, StubKind};
use tracing::{debug, info};

/// Registry of method configurations for the current example.
#[derive(Debug, Default)]
pub struct StubRegistry {
    methods: HashMap<(DoubleId, String), StubConfiguration>,
    null_objects: HashSet<DoubleId>,
}

impl StubRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `method` was configured on `double` as `kind`.
    ///
    /// Reconfiguring merges into the existing record (see
    /// [`StubConfiguration::merge`]). Returns the resulting record.
    pub fn configure(
        &mut self,
        double: DoubleId,
        method: &str,
        kind: StubKind,
    ) -> StubConfiguration {
        let record = match self.methods.get(&(double, method.to_owned())) {
            Some(existing) => existing.merge(kind),
            None => StubConfiguration::new(kind),
        };
        info!(
            double = %double,
            method,
            kind = %record.kind,
            "fmock::configure_method"
        );
        self.methods.insert((double, method.to_owned()), record);
        record
    }

    /// Mark `double` as a null object.
    pub fn mark_null_object(&mut self, double: DoubleId) {
        info!(double = %double, "fmock::configure_null_object");
        self.null_objects.insert(double);
    }

    /// Look up the configuration of `method` on `double`.
    #[must_use]
    pub fn find(&self, double: DoubleId, method: &str) -> Option<StubConfiguration> {
        let result = self.methods.get(&(double, method.to_owned())).copied();
        debug!(
            double = %double,
            method,
            hit = result.is_some(),
            "stub registry lookup"
        );
        result
    }

    #[must_use]
    pub fn is_null_object(&self, double: DoubleId) -> bool {
        self.null_objects.contains(&double)
    }

    /// Drop every configuration of `double`, including null-object status.
    pub fn forget_double(&mut self, double: DoubleId) {
        self.methods.retain(|(owner, _), _| *owner != double);
        self.null_objects.remove(&double);
    }

    pub fn clear(&mut self) {
        self.methods.clear();
        self.null_objects.clear();
    }
}
