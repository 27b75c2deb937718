//! Failure text for `have_received` assertions.
//!
//! Three shapes exist: a count failure (expected vs. received counts), an
//! unexpected-arguments failure (nothing matched the pattern but the method
//! was called), and an out-of-order failure. The exact tokens are consumed
//! verbatim by assertion reporting layers.

use fmock_types::{ArgValue, Call, CountConstraint};

use crate::config::VerifierConfig;
use crate::evaluator::group_calls;
use crate::matcher::{ANY_ARGS, ArgumentPattern, canonical_signature};
use crate::query::VerificationQuery;

/// Continuation indent of the `got:` block.
const GOT_INDENT: &str = "\n            ";

/// Why a verification failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FailureKind {
    /// The matched-call count violated the constraint.
    Count,
    /// A pattern was supplied, nothing matched, and the method was called.
    UnexpectedArguments,
    /// The count held but an ordered chain was violated.
    OutOfOrder,
}

/// `1 time`, `0 times`, `2 times`.
#[must_use]
pub fn times(n: usize) -> String {
    if n == 1 {
        "1 time".to_owned()
    } else {
        format!("{n} times")
    }
}

/// Expected-count wording for a constraint.
#[must_use]
pub fn expected_count(count: CountConstraint, negative: bool) -> String {
    if negative {
        return times(0);
    }
    match count {
        CountConstraint::Unconstrained => times(1),
        CountConstraint::Exactly(n) => times(n),
        CountConstraint::AtLeast(n) => format!("at least {}", times(n)),
        CountConstraint::AtMost(n) => format!("at most {}", times(n)),
    }
}

/// Parenthesised expected arguments shown after the method name.
#[must_use]
pub fn expected_args(pattern: Option<&ArgumentPattern>) -> String {
    pattern.map_or_else(|| ANY_ARGS.to_owned(), ArgumentPattern::describe)
}

/// Trailing ` with ...` part of a count line. Literal and predicate
/// patterns are only spelled out when `show_args` holds.
fn args_suffix(pattern: Option<&ArgumentPattern>, show_args: bool) -> String {
    match pattern {
        None | Some(ArgumentPattern::AnyArgs) => " with any arguments".to_owned(),
        Some(ArgumentPattern::Literal(args)) if args.is_empty() => {
            " with no arguments".to_owned()
        }
        Some(pattern) if show_args => format!(" with arguments: {}", pattern.describe()),
        Some(_) => String::new(),
    }
}

/// Render the diagnostic for a failed query.
///
/// `matched` is the number of calls that matched the pattern; `received`
/// is every call of the method, used for the `got:` block.
#[must_use]
pub fn format(
    query: &VerificationQuery<'_>,
    failure: FailureKind,
    matched: usize,
    received: &[Call],
    config: &VerifierConfig,
) -> String {
    match failure {
        FailureKind::Count => count_failure(query, matched),
        FailureKind::UnexpectedArguments => unexpected_arguments(query, received, config),
        FailureKind::OutOfOrder => out_of_order(query),
    }
}

fn count_failure(query: &VerificationQuery<'_>, matched: usize) -> String {
    let pattern = query.pattern();
    format!(
        "({}).{}{}\n    expected: {}{}\n    received: {}{}",
        query.double().unwrapped(),
        query.method_name(),
        expected_args(pattern),
        expected_count(query.count(), query.is_negative()),
        args_suffix(pattern, !query.is_negative()),
        times(matched),
        args_suffix(pattern, matched > 0),
    )
}

fn unexpected_arguments(
    query: &VerificationQuery<'_>,
    received: &[Call],
    config: &VerifierConfig,
) -> String {
    let mut out = format!(
        "{} received {} with unexpected arguments\n  expected: {}\n       got: ",
        query.double().inspect(),
        ArgValue::sym(query.method_name()),
        expected_args(query.pattern()),
    );

    let annotate = received.len() != 1;
    for (i, group) in group_calls(received).iter().enumerate() {
        if i > 0 {
            out.push_str(GOT_INDENT);
        }
        out.push('(');
        out.push_str(&group.signature);
        out.push(')');
        if annotate {
            out.push_str(" (");
            out.push_str(&times(group.count()));
            out.push(')');
        }
    }

    if let ([call], Some(ArgumentPattern::Literal(expected))) = (received, query.pattern()) {
        if config.diff_single_call {
            out.push_str(&diff(expected, &call.args));
        }
    }
    out
}

fn diff(expected: &[ArgValue], actual: &[ArgValue]) -> String {
    format!(
        "\nDiff:\n@@ -1 +1 @@\n-[{}]\n+[{}]",
        canonical_signature(expected),
        canonical_signature(actual)
    )
}

fn out_of_order(query: &VerificationQuery<'_>) -> String {
    format!(
        "{} received {} out of order",
        query.double().inspect(),
        ArgValue::sym(query.method_name())
    )
}
