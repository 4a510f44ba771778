use std::ops::Range;

use tracing::debug;

use crate::command::{Command, Invocation};
use crate::document::IndexQuery;
use crate::error::BoxError;

/// `ptag-set`: attach tags to the current document.
///
/// The block form builds every statement of its content as one tag; the
/// inline form builds exactly one.
pub struct TagSet;

impl Command for TagSet {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let source = inv.process_nest(content)?;
        let tags = &mut inv.document_mut().tags;
        let added = ptag::build_expressions(&source, |tag| tags.push(tag))?;
        debug!(added, "tags set");
        Ok(String::new())
    }

    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        let source = inv.process_nest(content)?;
        let tag = ptag::build_expression(&source)?;
        inv.document_mut().tags.push(tag);
        Ok(String::new())
    }
}

/// `ptag-filter`: emit an index of every document whose tags match.
///
/// The block form takes the conjunction of all its patterns; the inline
/// form takes exactly one. The output is an empty placeholder list filled
/// in once the whole build is known.
pub struct TagFilter;

impl TagFilter {
    fn register(inv: &mut Invocation<'_, '_>, pattern: ptag::Pattern) -> String {
        let query = IndexQuery {
            id: inv.gensym("filtered-index"),
            pattern,
        };
        let placeholder = query.placeholder();
        debug!(id = %query.id, "index query registered");
        inv.document_mut().queries.push(query);
        placeholder
    }
}

impl Command for TagFilter {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let source = inv.process_nest(content)?;
        let pattern = ptag::compile_conjunction(&source)?;
        Ok(Self::register(inv, pattern))
    }

    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        let source = inv.process_nest(content)?;
        let pattern = ptag::compile_pattern(&source)?;
        Ok(Self::register(inv, pattern))
    }
}
