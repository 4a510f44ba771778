use std::ops::Range;

use crate::command::{Command, Invocation};
use crate::error::BoxError;

/// Emits its content verbatim, without expanding directives in it.
pub struct Plain;

impl Command for Plain {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        Ok(inv.text(content).to_string())
    }
}
