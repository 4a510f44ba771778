use std::collections::BTreeMap;
use std::fmt;

/// A tag value: the result of building an expression and the subject of
/// pattern matching.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
    /// Uniform representation of `f(a, b)`.
    Call {
        function: Box<Value>,
        args: Vec<Value>,
    },
}

impl Value {
    pub fn call(function: impl Into<Value>, args: Vec<Value>) -> Self {
        Value::Call {
            function: Box::new(function.into()),
            args,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
            Value::Record(fields) => !fields.is_empty(),
            Value::Call { .. } => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "String",
            Value::Number(_) => "Number",
            Value::Bool(_) => "Boolean",
            Value::List(_) => "List",
            Value::Record(_) => "Record",
            Value::Call { .. } => "Call",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b, // NaN != NaN per IEEE 754
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (
                Value::Call {
                    function: f1,
                    args: a1,
                },
                Value::Call {
                    function: f2,
                    args: a2,
                },
            ) => f1 == f2 && a1 == a2,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Canonical text of a number, shared by display and record-key normalization.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn is_bare_word(s: &str) -> bool {
    let mut chars = s.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(s, "and" | "or" | "not" | "in" | "True" | "False" | "_" | "P")
}

fn write_str_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if is_bare_word(s) {
        return write!(f, "{}", s);
    }
    write!(f, "'")?;
    for c in s.chars() {
        match c {
            '\'' => write!(f, "\\'")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "'")
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Displays in ptag surface syntax, so the text builds back to an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write_str_literal(f, s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::List(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_str_literal(f, key)?;
                    write!(f, ": {}", value)?;
                }
                write!(f, "}}")
            }
            Value::Call { function, args } => {
                match function.as_ref() {
                    Value::Str(_) | Value::Call { .. } => write!(f, "{}", function)?,
                    other => write!(f, "({})", other)?,
                }
                write!(f, "(")?;
                write_list(f, args)?;
                write!(f, ")")
            }
        }
    }
}
