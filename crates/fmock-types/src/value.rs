use std::fmt;

/// A dynamically-typed argument passed to a double.
///
/// Equality is deep and structural: lists and maps compare element-wise in
/// order, and nested containers are never flattened, so `[[:one], :four]`
/// and `[:one, [:four]]` are different argument tuples. Floats compare by
/// bit pattern with every NaN treated as equal, which keeps the relation an
/// equivalence (and `-0.0` distinct from `0.0`).
///
/// [`Display`](fmt::Display) renders the inspect form used in failure
/// messages. It is injective on equality classes: two values render the same
/// text iff they are equal.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum ArgValue {
    /// `nil`.
    Nil,
    /// `true` / `false`.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A 64-bit IEEE 754 floating-point number.
    Float(f64),
    /// A UTF-8 string.
    Str(String),
    /// An interned name, rendered as `:name`.
    Symbol(String),
    /// An ordered sequence.
    List(Vec<ArgValue>),
    /// An insertion-ordered map.
    Map(Vec<(ArgValue, ArgValue)>),
    /// An opaque object identified by class name and identity, rendered
    /// `#<Class:0x...>`. Class names that are not constant paths are quoted.
    Object { class: String, id: u64 },
}

/// Coarse kind of an [`ArgValue`], used by `kind_of`-style matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ValueKind {
    Nil,
    Bool,
    Integer,
    Float,
    Str,
    Symbol,
    List,
    Map,
    Object,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nil => "NilClass",
            Self::Bool => "Boolean",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Str => "String",
            Self::Symbol => "Symbol",
            Self::List => "Array",
            Self::Map => "Hash",
            Self::Object => "Object",
        };
        f.write_str(name)
    }
}

impl ArgValue {
    /// Build a symbol value.
    pub fn sym(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Build a list value from anything convertible into arguments.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build an opaque object value.
    pub fn object(class: impl Into<String>, id: u64) -> Self {
        Self::Object {
            class: class.into(),
            id,
        }
    }

    /// Returns the kind of this value.
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Nil => ValueKind::Nil,
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Str(_) => ValueKind::Str,
            Self::Symbol(_) => ValueKind::Symbol,
            Self::List(_) => ValueKind::List,
            Self::Map(_) => ValueKind::Map,
            Self::Object { .. } => ValueKind::Object,
        }
    }

    /// Returns true if this is `nil`.
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Try to extract an integer value.
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to extract a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract a symbol name.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract list elements.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => float_eq(*a, *b),
            (Self::Str(a), Self::Str(b)) | (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (
                Self::Object { class: ca, id: ia },
                Self::Object { class: cb, id: ib },
            ) => ca == cb && ia == ib,
            _ => false,
        }
    }
}

impl Eq for ArgValue {}

/// Symbols that read as plain identifiers render bare (`:name`); anything
/// else is quoted (`:"two words"`).
fn is_plain_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    let body = name.trim_end_matches(['?', '!', '=']);
    let suffix_len = name.len() - body.len();
    suffix_len <= 1 && body.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Class names that read as constant paths (`Widget`, `Mod::Thing`) render
/// bare; anything else is quoted so the inspect form stays unambiguous.
fn is_plain_class(name: &str) -> bool {
    !name.is_empty()
        && name.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars.next().is_some_and(|c| c.is_ascii_uppercase())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn fmt_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        write!(f, "{v:.1}")
    } else if v.fract() == 0.0 {
        write!(f, "{v:e}")
    } else {
        write!(f, "{v}")
    }
}

fn fmt_seq<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a ArgValue>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => fmt_float(f, *v),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Symbol(s) if is_plain_symbol(s) => write!(f, ":{s}"),
            Self::Symbol(s) => write!(f, ":{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                fmt_seq(f, items.iter())?;
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}=>{v}")?;
                }
                f.write_str("}")
            }
            Self::Object { class, id } if is_plain_class(class) => {
                write!(f, "#<{class}:0x{id:016x}>")
            }
            Self::Object { class, id } => write!(f, "#<{class:?}:0x{id:016x}>"),
        }
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for ArgValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for ArgValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for ArgValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<Vec<Self>> for ArgValue {
    fn from(items: Vec<Self>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for ArgValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Nil, Into::into)
    }
}

/// Build a `Vec<ArgValue>` from heterogeneous convertible values.
///
/// ```
/// use fmock_types::{ArgValue, args};
///
/// let a = args![ArgValue::sym("one"), 4, "four"];
/// assert_eq!(a.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::ArgValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::ArgValue::from($value)),+]
    };
}
