pub mod value;

use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;

pub use value::{ArgValue, ValueKind};

/// Identity of a test double.
///
/// Allocated by the layer that creates doubles; the engine only uses it as a
/// ledger key. Zero is reserved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct DoubleId(NonZeroU64);

impl DoubleId {
    /// Create a double id from a raw value.
    ///
    /// Returns `None` if `n` is 0.
    #[inline]
    pub const fn new(n: u64) -> Option<Self> {
        match NonZeroU64::new(n) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Get the raw value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for DoubleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dbl#{}", self.0)
    }
}

impl TryFrom<u64> for DoubleId {
    type Error = InvalidDoubleId;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidDoubleId)
    }
}

/// Error returned when attempting to create a `DoubleId` from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDoubleId;

impl fmt::Display for InvalidDoubleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("double id cannot be zero")
    }
}

impl std::error::Error for InvalidDoubleId {}

/// Handle to a double as seen by the engine: its identity plus the optional
/// name used in failure messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DoubleRef {
    id: DoubleId,
    name: Option<String>,
}

impl DoubleRef {
    pub fn new(id: DoubleId, name: Option<String>) -> Self {
        Self { id, name }
    }

    /// A double created as `double("name")`.
    pub fn named(id: DoubleId, name: impl Into<String>) -> Self {
        Self::new(id, Some(name.into()))
    }

    /// A double created without a name.
    pub const fn anonymous(id: DoubleId) -> Self {
        Self { id, name: None }
    }

    #[inline]
    pub const fn id(&self) -> DoubleId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Inspect form: `#<Double "name">` or `#<Double (anonymous)>`.
    pub fn inspect(&self) -> String {
        format!("#<{}>", self.unwrapped())
    }

    /// Unwrapped form used as the receiver in count failures:
    /// `Double "name"` or `Double (anonymous)`.
    pub fn unwrapped(&self) -> String {
        match &self.name {
            Some(name) => format!("Double {name:?}"),
            None => "Double (anonymous)".to_owned(),
        }
    }
}

impl fmt::Display for DoubleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

/// Position of a call in the per-example recording order.
///
/// Sequence numbers start at 1 and are strictly increasing across all
/// doubles and methods recorded in one example.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct SequenceNo(u64);

impl SequenceNo {
    #[inline]
    pub const fn new(n: u64) -> Self {
        Self(n)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequenceNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a method was configured on a double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StubKind {
    /// Returns a canned value; eligible for `have_received` verification.
    Stub,
    /// Carries its own built-in expectation; not verifiable separately.
    MockExpectation,
}

impl fmt::Display for StubKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stub => "stub",
            Self::MockExpectation => "mock expectation",
        })
    }
}

/// Per (double, method) configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StubConfiguration {
    pub kind: StubKind,
    pub configured: bool,
}

impl StubConfiguration {
    pub const fn new(kind: StubKind) -> Self {
        Self {
            kind,
            configured: true,
        }
    }

    /// Fold a later configuration of the same method into this record.
    ///
    /// A mock expectation is never downgraded by a later plain stub.
    #[must_use]
    pub const fn merge(self, kind: StubKind) -> Self {
        match (self.kind, kind) {
            (StubKind::MockExpectation, _) | (_, StubKind::MockExpectation) => {
                Self::new(StubKind::MockExpectation)
            }
            (StubKind::Stub, StubKind::Stub) => Self::new(StubKind::Stub),
        }
    }

    pub const fn is_verifiable(self) -> bool {
        self.configured && matches!(self.kind, StubKind::Stub)
    }
}

/// Count constraint of a verification query.
///
/// `once`/`twice`/`thrice` are sugar for `Exactly(1/2/3)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum CountConstraint {
    /// At least one call (or none, for negated queries).
    #[default]
    Unconstrained,
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl CountConstraint {
    pub const ONCE: Self = Self::Exactly(1);
    pub const TWICE: Self = Self::Exactly(2);
    pub const THRICE: Self = Self::Exactly(3);

    pub const fn is_unconstrained(self) -> bool {
        matches!(self, Self::Unconstrained)
    }

    /// Whether `actual` calls satisfy this constraint.
    pub const fn admits(self, actual: usize, negative: bool) -> bool {
        match self {
            Self::Unconstrained if negative => actual == 0,
            Self::Unconstrained => actual >= 1,
            Self::Exactly(n) => actual == n,
            Self::AtLeast(n) => actual >= n,
            Self::AtMost(n) => actual <= n,
        }
    }

    /// DSL name of the combinator that produces this constraint.
    pub const fn combinator_name(self) -> Option<&'static str> {
        match self {
            Self::Unconstrained => None,
            Self::Exactly(_) => Some("exactly"),
            Self::AtLeast(_) => Some("at_least"),
            Self::AtMost(_) => Some("at_most"),
        }
    }
}

/// Count argument of `exactly`/`at_least`/`at_most`: a number or one of
/// the named counts, as in `at_most(CountArg::Thrice)`.
///
/// Plain integer literals convert directly; negative counts clamp to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountArg {
    Times(usize),
    Once,
    Twice,
    Thrice,
}

impl CountArg {
    pub const fn get(self) -> usize {
        match self {
            Self::Times(n) => n,
            Self::Once => 1,
            Self::Twice => 2,
            Self::Thrice => 3,
        }
    }
}

impl From<usize> for CountArg {
    fn from(n: usize) -> Self {
        Self::Times(n)
    }
}

impl From<u32> for CountArg {
    fn from(n: u32) -> Self {
        Self::Times(usize::try_from(n).unwrap_or(usize::MAX))
    }
}

impl From<i32> for CountArg {
    fn from(n: i32) -> Self {
        Self::Times(usize::try_from(n).unwrap_or(0))
    }
}

/// Opaque reference to the block passed along with an intercepted call.
#[derive(Clone)]
pub struct CallBlock(Arc<dyn Fn(&[ArgValue]) -> ArgValue + Send + Sync>);

impl CallBlock {
    pub fn new(f: impl Fn(&[ArgValue]) -> ArgValue + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invoke the block.
    pub fn call(&self, args: &[ArgValue]) -> ArgValue {
        (self.0)(args)
    }

    /// Whether two handles refer to the same block.
    pub fn same_block(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CallBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallBlock(..)")
    }
}

/// One recorded call to a double. Immutable once recorded.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Call {
    pub double_id: DoubleId,
    pub method_name: String,
    pub args: Vec<ArgValue>,
    #[serde(skip)]
    pub block: Option<CallBlock>,
    pub sequence_no: SequenceNo,
}

impl PartialEq for Call {
    fn eq(&self, other: &Self) -> bool {
        self.double_id == other.double_id
            && self.method_name == other.method_name
            && self.args == other.args
            && self.sequence_no == other.sequence_no
            && match (&self.block, &other.block) {
                (None, None) => true,
                (Some(a), Some(b)) => a.same_block(b),
                _ => false,
            }
    }
}
