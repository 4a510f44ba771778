//! Boolean guards: the `P[...]` escape inside patterns.
//!
//! A guard sees the current subject as `_` and every capture bound so far
//! by name. Its grammar is deliberately small: literals, names, list
//! literals, indexing, `len(x)`, comparisons, `in`, unary minus and the
//! boolean connectives.

use std::cmp::Ordering;

use tracing::trace;

use crate::ast::{CompareOp, Node, NodeKind};
use crate::matching::CaptureScope;
use crate::parser::{CompileError, CompileErrorKind};
use crate::value::Value;

/// A validated guard condition. `P[a, b]` is the conjunction of `a` and `b`.
#[derive(Debug, Clone)]
pub struct Guard {
    conditions: Vec<Node>,
}

impl Guard {
    pub fn compile(items: &[Node]) -> Result<Guard, CompileError> {
        for item in items {
            validate(item)?;
        }
        Ok(Guard {
            conditions: items.to_vec(),
        })
    }

    /// Evaluate against `subject`. An evaluation failure counts as false.
    pub fn test(&self, subject: &Value, scope: &CaptureScope) -> bool {
        let env = GuardEnv { subject, scope };
        self.conditions
            .iter()
            .all(|condition| match env.eval(condition) {
                Ok(value) => value.is_truthy(),
                Err(failure) => {
                    trace!(%failure, "guard evaluation failed");
                    false
                }
            })
    }
}

fn validate(node: &Node) -> Result<(), CompileError> {
    match &node.kind {
        NodeKind::Name(_) | NodeKind::Number(_) | NodeKind::Str(_) | NodeKind::Bool(_) => Ok(()),
        NodeKind::Negate(inner) | NodeKind::Not(inner) => validate(inner),
        NodeKind::And(operands) | NodeKind::Or(operands) | NodeKind::List(operands) => {
            operands.iter().try_for_each(validate)
        }
        NodeKind::Compare { left, right, .. } => {
            validate(left)?;
            validate(right)
        }
        NodeKind::Subscript { target, items } => {
            if node.is_guard() {
                return Err(CompileError::unsupported("a nested guard", node.span.clone()));
            }
            if items.len() != 1 {
                return Err(CompileError::unsupported(
                    "indexing with more than one key",
                    node.span.clone(),
                ));
            }
            validate(target)?;
            validate(&items[0])
        }
        NodeKind::Call { function, args } => {
            let is_len = matches!(&function.kind, NodeKind::Name(name) if name == "len");
            if !is_len {
                return Err(CompileError::unsupported(
                    "calling anything but len() in a guard",
                    node.span.clone(),
                ));
            }
            if args.len() != 1 {
                return Err(CompileError::syntax(
                    "len() takes exactly one argument",
                    node.span.clone(),
                ));
            }
            match &args[0].kind {
                NodeKind::Keyword { .. } => Err(CompileError::new(
                    CompileErrorKind::KeywordArgument,
                    args[0].span.clone(),
                )),
                _ => validate(&args[0]),
            }
        }
        NodeKind::Keyword { .. } => Err(CompileError::new(
            CompileErrorKind::KeywordArgument,
            node.span.clone(),
        )),
        NodeKind::Starred(_) => Err(CompileError::new(
            CompileErrorKind::MisplacedStarred,
            node.span.clone(),
        )),
        NodeKind::Capture(_) | NodeKind::Record(_) => Err(CompileError::unsupported(
            format!("a {} inside a guard", node.describe()),
            node.span.clone(),
        )),
    }
}

#[derive(Debug, thiserror::Error)]
enum EvalFailure {
    #[error("unbound name '{0}'")]
    Unbound(String),
    #[error("cannot {op} {left} and {right}")]
    Incompatible {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot negate {0}")]
    Negate(&'static str),
    #[error("index out of range")]
    OutOfRange,
    #[error("no field '{0}'")]
    MissingField(String),
    #[error("{0} has no length")]
    NoLength(&'static str),
}

struct GuardEnv<'a> {
    subject: &'a Value,
    scope: &'a CaptureScope,
}

impl GuardEnv<'_> {
    fn eval(&self, node: &Node) -> Result<Value, EvalFailure> {
        match &node.kind {
            NodeKind::Name(name) if name == "_" => Ok(self.subject.clone()),
            NodeKind::Name(name) => self
                .scope
                .get(name)
                .cloned()
                .ok_or_else(|| EvalFailure::Unbound(name.clone())),
            NodeKind::Number(n) => Ok(Value::Number(*n)),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Bool(b) => Ok(Value::Bool(*b)),
            NodeKind::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),

            NodeKind::Negate(inner) => match self.eval(inner)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(EvalFailure::Negate(other.type_name())),
            },
            NodeKind::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.is_truthy())),

            // Short-circuit, yielding the deciding operand.
            NodeKind::And(operands) => {
                let mut last = Value::Bool(true);
                for operand in operands {
                    last = self.eval(operand)?;
                    if !last.is_truthy() {
                        break;
                    }
                }
                Ok(last)
            }
            NodeKind::Or(operands) => {
                let mut last = Value::Bool(false);
                for operand in operands {
                    last = self.eval(operand)?;
                    if last.is_truthy() {
                        break;
                    }
                }
                Ok(last)
            }

            NodeKind::Compare { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare(*op, &left, &right).map(Value::Bool)
            }

            NodeKind::Subscript { target, items } => {
                let target = self.eval(target)?;
                let key = self.eval(&items[0])?;
                index(&target, &key)
            }

            NodeKind::Call { args, .. } => match self.eval(&args[0])? {
                Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
                Value::List(items) => Ok(Value::Number(items.len() as f64)),
                Value::Record(fields) => Ok(Value::Number(fields.len() as f64)),
                other => Err(EvalFailure::NoLength(other.type_name())),
            },

            // Rejected by `validate`.
            NodeKind::Capture(_)
            | NodeKind::Record(_)
            | NodeKind::Starred(_)
            | NodeKind::Keyword { .. } => Ok(Value::Bool(false)),
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalFailure> {
    let ordering = || -> Result<Ordering, EvalFailure> {
        let ordering = match (left, right) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        };
        ordering.ok_or(EvalFailure::Incompatible {
            op: "order",
            left: left.type_name(),
            right: right.type_name(),
        })
    };

    match op {
        CompareOp::Eq => Ok(left == right),
        CompareOp::NotEq => Ok(left != right),
        CompareOp::Lt => Ok(ordering()? == Ordering::Less),
        CompareOp::LtEq => Ok(ordering()? != Ordering::Greater),
        CompareOp::Gt => Ok(ordering()? == Ordering::Greater),
        CompareOp::GtEq => Ok(ordering()? != Ordering::Less),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
    }
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalFailure> {
    match (container, item) {
        (Value::List(items), _) => Ok(items.contains(item)),
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Record(fields), Value::Str(key)) => Ok(fields.contains_key(key)),
        _ => Err(EvalFailure::Incompatible {
            op: "search",
            left: container.type_name(),
            right: item.type_name(),
        }),
    }
}

fn index(target: &Value, key: &Value) -> Result<Value, EvalFailure> {
    match (target, key) {
        (Value::List(items), Value::Number(n)) => {
            let i = resolve_index(*n, items.len())?;
            Ok(items[i].clone())
        }
        (Value::Str(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(*n, chars.len())?;
            Ok(Value::Str(chars[i].to_string()))
        }
        (Value::Record(fields), Value::Str(name)) => fields
            .get(name)
            .cloned()
            .ok_or_else(|| EvalFailure::MissingField(name.clone())),
        _ => Err(EvalFailure::Incompatible {
            op: "index",
            left: target.type_name(),
            right: key.type_name(),
        }),
    }
}

/// Integral index, negative counting from the end.
fn resolve_index(n: f64, len: usize) -> Result<usize, EvalFailure> {
    if n.fract() != 0.0 {
        return Err(EvalFailure::OutOfRange);
    }
    let i = if n < 0.0 { len as f64 + n } else { n };
    if i < 0.0 || i >= len as f64 {
        return Err(EvalFailure::OutOfRange);
    }
    Ok(i as usize)
}
