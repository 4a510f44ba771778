use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::ast::{Node, NodeKind, RecordEntry};
use crate::compile::constant_key;
use crate::guard::Guard;
use crate::matching::CaptureScope;
use crate::parser::{CompileError, CompileErrorKind};
use crate::value::Value;

type Matcher = dyn Fn(&Value, &mut CaptureScope) -> bool + Send + Sync;

/// A compiled pattern: a predicate over a subject that may bind captures.
///
/// Patterns are immutable closures over their sub-patterns and can be
/// cloned and shared freely; each independent match attempt needs its own
/// [`CaptureScope`].
#[derive(Clone)]
pub struct Pattern {
    matcher: Arc<Matcher>,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pattern { .. }")
    }
}

impl Pattern {
    fn new(matcher: impl Fn(&Value, &mut CaptureScope) -> bool + Send + Sync + 'static) -> Self {
        Pattern {
            matcher: Arc::new(matcher),
        }
    }

    pub fn matches(&self, subject: &Value, scope: &mut CaptureScope) -> bool {
        (self.matcher)(subject, scope)
    }

    pub fn wildcard() -> Self {
        Pattern::new(|_, _| true)
    }

    pub fn literal(expected: Value) -> Self {
        Pattern::new(move |subject, _| *subject == expected)
    }

    pub fn capture(name: impl Into<String>) -> Self {
        let name = name.into();
        Pattern::new(move |subject, scope| {
            scope.insert(name.clone(), subject.clone());
            true
        })
    }

    /// Succeeds iff `inner` fails. `inner` runs against a copy of the scope.
    pub fn negate(inner: Pattern) -> Self {
        Pattern::new(move |subject, scope| {
            let mut isolated = scope.clone();
            !inner.matches(subject, &mut isolated)
        })
    }

    pub fn and(self, other: Pattern) -> Self {
        Pattern::new(move |subject, scope| self.matches(subject, scope) && other.matches(subject, scope))
    }

    pub fn or(self, other: Pattern) -> Self {
        Pattern::new(move |subject, scope| self.matches(subject, scope) || other.matches(subject, scope))
    }

    /// A list of exactly `elements.len()` items, matched positionally.
    pub fn sequence(elements: Vec<Pattern>) -> Self {
        Pattern::new(move |subject, scope| {
            let Value::List(items) = subject else {
                return false;
            };
            items.len() == elements.len()
                && items
                    .iter()
                    .zip(&elements)
                    .all(|(item, pattern)| pattern.matches(item, scope))
        })
    }

    /// `[init.., *rest, tail..]`: `rest` sees the middle slice as a list.
    pub fn splat_sequence(init: Vec<Pattern>, rest: Pattern, tail: Vec<Pattern>) -> Self {
        Pattern::new(move |subject, scope| {
            let Value::List(items) = subject else {
                return false;
            };
            if items.len() < init.len() + tail.len() {
                return false;
            }
            let tail_start = items.len() - tail.len();
            for (item, pattern) in items.iter().zip(&init) {
                if !pattern.matches(item, scope) {
                    return false;
                }
            }
            for (item, pattern) in items[tail_start..].iter().zip(&tail) {
                if !pattern.matches(item, scope) {
                    return false;
                }
            }
            let middle = Value::List(items[init.len()..tail_start].to_vec());
            rest.matches(&middle, scope)
        })
    }

    /// A call-value with exactly `args.len()` arguments.
    pub fn call(function: Pattern, args: Vec<Pattern>) -> Self {
        Pattern::new(move |subject, scope| {
            let Value::Call {
                function: subject_function,
                args: subject_args,
            } = subject
            else {
                return false;
            };
            subject_args.len() == args.len()
                && function.matches(subject_function, scope)
                && subject_args
                    .iter()
                    .zip(&args)
                    .all(|(arg, pattern)| pattern.matches(arg, scope))
        })
    }

    /// A record holding every listed key; extra keys are ignored.
    pub fn record(fields: Vec<(String, Pattern)>) -> Self {
        Pattern::new(move |subject, scope| {
            let Value::Record(subject_fields) = subject else {
                return false;
            };
            fields.iter().all(|(key, pattern)| {
                subject_fields
                    .get(key)
                    .is_some_and(|value| pattern.matches(value, scope))
            })
        })
    }

    pub fn guard(guard: Guard) -> Self {
        Pattern::new(move |subject, scope| guard.test(subject, scope))
    }
}

// ---------------------------------------------------------------------------
// Syntax tree → Pattern
// ---------------------------------------------------------------------------

pub(crate) fn compile_node(node: &Node) -> Result<Pattern, CompileError> {
    match &node.kind {
        NodeKind::Name(name) if name == "_" => Ok(Pattern::wildcard()),
        NodeKind::Name(name) => Ok(Pattern::literal(Value::Str(name.clone()))),
        NodeKind::Number(n) => Ok(Pattern::literal(Value::Number(*n))),
        NodeKind::Str(s) => Ok(Pattern::literal(Value::Str(s.clone()))),
        NodeKind::Bool(b) => Ok(Pattern::literal(Value::Bool(*b))),
        NodeKind::Capture(name) => Ok(Pattern::capture(name.clone())),
        NodeKind::Not(inner) => Ok(Pattern::negate(compile_node(inner)?)),

        NodeKind::And(operands) => fold(operands, Pattern::and),
        NodeKind::Or(operands) => fold(operands, Pattern::or),

        NodeKind::List(elements) => compile_list(elements),

        NodeKind::Record(entries) => {
            let mut seen = HashSet::new();
            let mut fields = Vec::with_capacity(entries.len());
            for entry in entries {
                let (key, value) = match entry {
                    RecordEntry::Pair(key, value) => (key, value),
                    RecordEntry::Splat(inner) => {
                        return Err(CompileError::new(CompileErrorKind::RecordSplat, inner.span.clone()));
                    }
                };
                let key_text = constant_key(key)?;
                if !seen.insert(key_text.clone()) {
                    return Err(CompileError::new(
                        CompileErrorKind::DuplicateKey(key_text),
                        key.span.clone(),
                    ));
                }
                fields.push((key_text, compile_node(value)?));
            }
            Ok(Pattern::record(fields))
        }

        NodeKind::Call { function, args } => {
            let function = compile_node(function)?;
            let args = args
                .iter()
                .map(compile_argument)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Pattern::call(function, args))
        }

        NodeKind::Subscript { items, .. } if node.is_guard() => Ok(Pattern::guard(Guard::compile(items)?)),
        NodeKind::Subscript { .. } => Err(CompileError::unsupported(
            "subscript other than the guard escape 'P[...]'",
            node.span.clone(),
        )
        .with_note("write the condition as P[...] to test the subject")),

        NodeKind::Starred(_) => Err(CompileError::new(
            CompileErrorKind::MisplacedStarred,
            node.span.clone(),
        )),
        NodeKind::Keyword { .. } => Err(CompileError::new(
            CompileErrorKind::KeywordArgument,
            node.span.clone(),
        )),
        NodeKind::Negate(_) | NodeKind::Compare { .. } => Err(CompileError::unsupported(
            format!("{} in a pattern", node.describe()),
            node.span.clone(),
        )
        .with_note("comparisons belong inside a guard: P[...]")),
    }
}

fn compile_argument(node: &Node) -> Result<Pattern, CompileError> {
    match &node.kind {
        NodeKind::Keyword { .. } => Err(CompileError::new(
            CompileErrorKind::KeywordArgument,
            node.span.clone(),
        )),
        _ => compile_node(node),
    }
}

fn compile_list(elements: &[Node]) -> Result<Pattern, CompileError> {
    let mut starred = elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| match &e.kind {
            NodeKind::Starred(inner) => Some((i, e, inner)),
            _ => None,
        });
    let Some((split, _, rest)) = starred.next() else {
        let patterns = elements
            .iter()
            .map(compile_node)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Pattern::sequence(patterns));
    };
    if let Some((_, second, _)) = starred.next() {
        return Err(CompileError::new(
            CompileErrorKind::MultipleStarred,
            second.span.clone(),
        ));
    }

    let init = elements[..split]
        .iter()
        .map(compile_node)
        .collect::<Result<Vec<_>, _>>()?;
    let tail = elements[split + 1..]
        .iter()
        .map(compile_node)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Pattern::splat_sequence(init, compile_node(rest)?, tail))
}

/// Left-associative fold of sibling patterns.
fn fold(operands: &[Node], combine: fn(Pattern, Pattern) -> Pattern) -> Result<Pattern, CompileError> {
    let mut patterns = operands.iter().map(compile_node);
    let first = patterns
        .next()
        .ok_or_else(|| CompileError::syntax("empty boolean operation", 0..0))??;
    patterns.try_fold(first, |acc, next| Ok(combine(acc, next?)))
}
