//! Expectation targets: `expect(double).to(have_received(..))` and the
//! entry points that cannot verify received messages.

use fmock_error::{MockError, Result};
use fmock_types::{ArgValue, CallBlock, DoubleRef};

use crate::evaluator::VerificationResult;
use crate::query::HaveReceived;
use crate::session::Session;

/// Entry point an assertion was issued through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Expect,
    Allow,
    AllowAnyInstanceOf,
    ExpectAnyInstanceOf,
}

impl TargetKind {
    /// DSL name of the entry point.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Expect => "expect",
            Self::Allow => "allow",
            Self::AllowAnyInstanceOf => "allow_any_instance_of",
            Self::ExpectAnyInstanceOf => "expect_any_instance_of",
        }
    }

    /// Rejects every entry point except `expect`.
    fn check_supported(self) -> Result<()> {
        match self {
            Self::Expect => Ok(()),
            Self::Allow => Err(MockError::UnsupportedTarget {
                target: self.name(),
                no_effect: true,
            }),
            Self::AllowAnyInstanceOf | Self::ExpectAnyInstanceOf => {
                Err(MockError::UnsupportedTarget {
                    target: self.name(),
                    no_effect: false,
                })
            }
        }
    }
}

/// A double bound to an entry point, ready for `to`/`not_to`.
#[derive(Debug, Clone)]
pub struct ExpectationTarget<'s> {
    session: &'s Session,
    double: DoubleRef,
    kind: TargetKind,
}

impl<'s> ExpectationTarget<'s> {
    pub(crate) const fn new(session: &'s Session, double: DoubleRef, kind: TargetKind) -> Self {
        Self {
            session,
            double,
            kind,
        }
    }

    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    pub const fn double(&self) -> &DoubleRef {
        &self.double
    }

    fn run(&self, matcher: HaveReceived<'_>, negative: bool) -> Result<VerificationResult> {
        self.kind.check_supported()?;
        let query = matcher.into_query(&self.double, negative)?;
        self.session.verify(query)?.into_result()
    }

    /// Assert the double received the message.
    pub fn to(&self, matcher: HaveReceived<'_>) -> Result<VerificationResult> {
        self.run(matcher, false)
    }

    /// Like [`ExpectationTarget::to`], with a target-level block.
    ///
    /// A block attached to the matcher itself with `yielding` takes
    /// precedence; `callback` is only used when the matcher has none.
    pub fn to_with<'a>(
        &self,
        matcher: HaveReceived<'a>,
        callback: impl FnMut(&[ArgValue], Option<&CallBlock>) + 'a,
    ) -> Result<VerificationResult> {
        self.run(matcher.or_yielding(Box::new(callback)), false)
    }

    /// Assert the double did not receive the message.
    pub fn not_to(&self, matcher: HaveReceived<'_>) -> Result<VerificationResult> {
        self.run(matcher, true)
    }
}
