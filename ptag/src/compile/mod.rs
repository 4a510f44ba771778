mod expression;
mod pattern;

pub use pattern::Pattern;

use tracing::trace;

use crate::ast::{Node, NodeKind};
use crate::parser::{CompileError, CompileErrorKind, parse_block, parse_single};
use crate::value::{Value, format_number};

/// Compile a source holding exactly one pattern.
pub fn compile_pattern(source: &str) -> Result<Pattern, CompileError> {
    pattern::compile_node(&parse_single(source)?)
}

/// Compile every statement of a block into an independent pattern.
///
/// The whole block is compiled before anything is returned, so a bad
/// entry anywhere rejects the block.
pub fn compile_patterns(source: &str) -> Result<Vec<Pattern>, CompileError> {
    let statements = parse_block(source)?;
    trace!(count = statements.len(), "compiling pattern block");
    statements.iter().map(pattern::compile_node).collect()
}

/// Compile a block and combine its patterns with `and`.
pub fn compile_conjunction(source: &str) -> Result<Pattern, CompileError> {
    compile_patterns(source)?
        .into_iter()
        .reduce(Pattern::and)
        .ok_or_else(|| CompileError::new(CompileErrorKind::EmptyPatternList, 0..source.len()))
}

/// Build the value of a source holding exactly one expression.
pub fn build_expression(source: &str) -> Result<Value, CompileError> {
    expression::build_node(&parse_single(source)?)
}

/// Build every statement of a block and hand each value to `add`, in order.
///
/// `add` is not called at all unless every entry builds. Returns the
/// number of values produced.
pub fn build_expressions(
    source: &str,
    mut add: impl FnMut(Value),
) -> Result<usize, CompileError> {
    let values = parse_block(source)?
        .iter()
        .map(expression::build_node)
        .collect::<Result<Vec<_>, _>>()?;
    let count = values.len();
    for value in values {
        add(value);
    }
    Ok(count)
}

/// Record keys must be written as names, strings or numbers.
pub(crate) fn constant_key(key: &Node) -> Result<String, CompileError> {
    match &key.kind {
        NodeKind::Name(name) => Ok(name.clone()),
        NodeKind::Str(s) => Ok(s.clone()),
        NodeKind::Number(n) => Ok(format_number(*n)),
        _ => Err(CompileError::new(CompileErrorKind::NonConstantKey, key.span.clone())),
    }
}
