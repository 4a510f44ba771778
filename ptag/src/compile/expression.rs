use std::collections::BTreeMap;

use crate::ast::{Node, NodeKind, RecordEntry};
use crate::compile::constant_key;
use crate::parser::{CompileError, CompileErrorKind};
use crate::value::Value;

/// Build the value an expression denotes. Names stand for themselves.
pub(crate) fn build_node(node: &Node) -> Result<Value, CompileError> {
    match &node.kind {
        NodeKind::Name(name) if name == "_" => Err(CompileError::unsupported(
            "a wildcard in an expression",
            node.span.clone(),
        )
        .with_note("write '_' to build the string")),
        NodeKind::Name(name) => Ok(Value::Str(name.clone())),
        NodeKind::Number(n) => Ok(Value::Number(*n)),
        NodeKind::Str(s) => Ok(Value::Str(s.clone())),
        NodeKind::Bool(b) => Ok(Value::Bool(*b)),

        NodeKind::List(elements) => elements
            .iter()
            .map(|element| match &element.kind {
                NodeKind::Starred(_) => Err(CompileError::unsupported(
                    "splatting in an expression",
                    element.span.clone(),
                )),
                _ => build_node(element),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        NodeKind::Record(entries) => {
            let mut fields = BTreeMap::new();
            for entry in entries {
                let (key, value) = match entry {
                    RecordEntry::Pair(key, value) => (key, value),
                    RecordEntry::Splat(inner) => {
                        return Err(CompileError::new(CompileErrorKind::RecordSplat, inner.span.clone()));
                    }
                };
                let key_text = constant_key(key)?;
                if fields.contains_key(&key_text) {
                    return Err(CompileError::new(
                        CompileErrorKind::DuplicateKey(key_text),
                        key.span.clone(),
                    ));
                }
                fields.insert(key_text, build_node(value)?);
            }
            Ok(Value::Record(fields))
        }

        NodeKind::Call { function, args } => {
            let function = build_node(function)?;
            let args = args
                .iter()
                .map(|arg| match &arg.kind {
                    NodeKind::Keyword { .. } => Err(CompileError::new(
                        CompileErrorKind::KeywordArgument,
                        arg.span.clone(),
                    )),
                    NodeKind::Starred(_) => Err(CompileError::unsupported(
                        "splatting in an expression",
                        arg.span.clone(),
                    )),
                    _ => build_node(arg),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::call(function, args))
        }

        NodeKind::Capture(_) => Err(CompileError::unsupported(
            "a capture in an expression",
            node.span.clone(),
        )
        .with_note("captures only make sense in patterns")),
        NodeKind::Keyword { .. } => Err(CompileError::new(
            CompileErrorKind::KeywordArgument,
            node.span.clone(),
        )),
        NodeKind::Starred(_) => Err(CompileError::unsupported(
            "splatting in an expression",
            node.span.clone(),
        )),
        NodeKind::Negate(_)
        | NodeKind::Not(_)
        | NodeKind::And(_)
        | NodeKind::Or(_)
        | NodeKind::Compare { .. }
        | NodeKind::Subscript { .. } => Err(CompileError::unsupported(
            format!("{} in an expression", node.describe()),
            node.span.clone(),
        )),
    }
}
