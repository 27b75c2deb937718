//! Argument patterns and canonical argument signatures.
//!
//! A pattern is one of three shapes: a literal argument tuple compared with
//! deep structural equality, a predicate over the whole tuple, or
//! [`ArgumentPattern::AnyArgs`]. Predicates are the extension point for
//! matcher libraries; [`Positional`] and [`FnPredicate`] are the built-in
//! ones.
//!
//! # Contract
//!
//! [`canonical_signature`] is deterministic and order-preserving, and two
//! argument tuples produce the same signature iff they are deeply equal.
//! Nested sequences are rendered with their brackets, never flattened.

use std::fmt;
use std::sync::Arc;

use fmock_types::{ArgValue, ValueKind};

/// A predicate over a complete actual argument tuple.
pub trait ArgsPredicate: Send + Sync {
    /// Whether `actual` satisfies the predicate.
    fn matches(&self, actual: &[ArgValue]) -> bool;

    /// Text shown between the parentheses of `expected: (...)`.
    fn description(&self) -> String;
}

/// Expected-argument pattern of a verification query.
#[derive(Clone)]
pub enum ArgumentPattern {
    /// Element-wise deep equality with this exact tuple.
    Literal(Vec<ArgValue>),
    /// Delegates to an external predicate.
    Predicate(Arc<dyn ArgsPredicate>),
    /// Matches any tuple, of any arity.
    AnyArgs,
}

impl fmt::Debug for ArgumentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(args) => f.debug_tuple("Literal").field(args).finish(),
            Self::Predicate(p) => f.debug_tuple("Predicate").field(&p.description()).finish(),
            Self::AnyArgs => f.write_str("AnyArgs"),
        }
    }
}

impl ArgumentPattern {
    /// Literal pattern from anything convertible into arguments.
    pub fn literal<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ArgValue>,
    {
        Self::Literal(args.into_iter().map(Into::into).collect())
    }

    /// Pattern matching only calls made with no arguments.
    pub const fn no_args() -> Self {
        Self::Literal(Vec::new())
    }

    pub fn predicate(predicate: impl ArgsPredicate + 'static) -> Self {
        Self::Predicate(Arc::new(predicate))
    }

    /// Whether `actual` matches this pattern.
    pub fn matches(&self, actual: &[ArgValue]) -> bool {
        match self {
            Self::Literal(expected) => expected.as_slice() == actual,
            Self::Predicate(p) => p.matches(actual),
            Self::AnyArgs => true,
        }
    }

    /// Whether the pattern accepts every tuple.
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::AnyArgs)
    }

    /// Parenthesised rendering: `(:one, :four)`, `(no args)`,
    /// `(*(any args))`, or `(<predicate description>)`.
    pub fn describe(&self) -> String {
        match self {
            Self::Literal(args) => format_args(args),
            Self::Predicate(p) => format!("({})", p.description()),
            Self::AnyArgs => ANY_ARGS.to_owned(),
        }
    }
}

pub(crate) const ANY_ARGS: &str = "(*(any args))";

/// Whether `actual` matches `pattern`; `None` matches everything.
pub fn matches(pattern: Option<&ArgumentPattern>, actual: &[ArgValue]) -> bool {
    pattern.is_none_or(|p| p.matches(actual))
}

/// Canonical structural signature of an argument tuple, without the
/// surrounding parentheses: `[:one], :four`.
pub fn canonical_signature(args: &[ArgValue]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&arg.to_string());
    }
    out
}

/// Parenthesised argument list as shown in diagnostics.
pub fn format_args(args: &[ArgValue]) -> String {
    if args.is_empty() {
        "(no args)".to_owned()
    } else {
        format!("({})", canonical_signature(args))
    }
}

// ── Built-in predicates ─────────────────────────────────────────────────

/// Matcher for a single argument position.
#[derive(Clone)]
pub enum ValueMatcher {
    /// Deep equality.
    Eq(ArgValue),
    /// Any value.
    Anything,
    /// Any value of the given kind.
    KindOf(ValueKind),
    /// Caller-supplied test with its own description.
    Satisfies {
        description: String,
        test: Arc<dyn Fn(&ArgValue) -> bool + Send + Sync>,
    },
}

impl ValueMatcher {
    /// Deep equality with anything convertible into an argument.
    pub fn equal_to(value: impl Into<ArgValue>) -> Self {
        Self::Eq(value.into())
    }

    pub fn satisfies(
        description: impl Into<String>,
        test: impl Fn(&ArgValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Satisfies {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    pub fn matches(&self, actual: &ArgValue) -> bool {
        match self {
            Self::Eq(expected) => expected == actual,
            Self::Anything => true,
            Self::KindOf(kind) => actual.kind() == *kind,
            Self::Satisfies { test, .. } => test(actual),
        }
    }
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq(v) => write!(f, "{v}"),
            Self::Anything => f.write_str("anything"),
            Self::KindOf(kind) => write!(f, "kind of {kind}"),
            Self::Satisfies { description, .. } => f.write_str(description),
        }
    }
}

impl fmt::Debug for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueMatcher({self})")
    }
}

impl From<ArgValue> for ValueMatcher {
    fn from(value: ArgValue) -> Self {
        Self::Eq(value)
    }
}

/// One matcher per argument position; arity must match exactly.
#[derive(Debug, Clone)]
pub struct Positional(pub Vec<ValueMatcher>);

impl ArgsPredicate for Positional {
    fn matches(&self, actual: &[ArgValue]) -> bool {
        self.0.len() == actual.len() && self.0.iter().zip(actual).all(|(m, a)| m.matches(a))
    }

    fn description(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Predicate backed by a closure over the whole tuple.
pub struct FnPredicate<F> {
    description: String,
    test: F,
}

impl<F> FnPredicate<F>
where
    F: Fn(&[ArgValue]) -> bool + Send + Sync,
{
    pub fn new(description: impl Into<String>, test: F) -> Self {
        Self {
            description: description.into(),
            test,
        }
    }
}

impl<F> ArgsPredicate for FnPredicate<F>
where
    F: Fn(&[ArgValue]) -> bool + Send + Sync,
{
    fn matches(&self, actual: &[ArgValue]) -> bool {
        (self.test)(actual)
    }

    fn description(&self) -> String {
        self.description.clone()
    }
}
