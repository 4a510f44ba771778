use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::context::{Context, Frame};
use crate::document::Document;
use crate::error::{BoxError, ScanError};
use crate::storage::Storage;

/// A text transformation invoked by a directive.
///
/// A fresh instance is constructed for every block or inline command, so
/// implementations may keep per-invocation state in `self`.
pub trait Command {
    /// Expand a `@begin name args...` block whose content spans `content`.
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError>;

    /// Expand an inline `@name|...|` command.
    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        self.full_block(inv, &[], content)
    }
}

/// Constructs a command for the context that encountered its directive.
pub type CommandFactory = Arc<dyn Fn(&Context<'_>) -> Box<dyn Command> + Send + Sync>;

/// Wrap a closure as a [`CommandFactory`].
pub fn factory(
    construct: impl Fn(&Context<'_>) -> Box<dyn Command> + Send + Sync + 'static,
) -> CommandFactory {
    Arc::new(construct)
}

/// What a running command can see and do: the scanned source, its own
/// frame, nested expansion and the build state.
pub struct Invocation<'c, 'a> {
    context: &'c mut Context<'a>,
    frame: &'c Frame,
}

impl<'c, 'a> Invocation<'c, 'a> {
    pub(crate) fn new(context: &'c mut Context<'a>, frame: &'c Frame) -> Self {
        Invocation { context, frame }
    }

    pub fn frame(&self) -> &Frame {
        self.frame
    }

    pub fn source(&self) -> &'a str {
        self.context.source()
    }

    pub fn text(&self, range: Range<usize>) -> &'a str {
        self.context.text(range)
    }

    pub fn file(&self) -> &'a str {
        self.context.file()
    }

    /// Expand `range` of the source as an independent nested scan.
    ///
    /// The nested scan starts at the line and column recorded for this
    /// command's frame rather than the exact position of `range`.
    pub fn process_nest(&mut self, range: Range<usize>) -> Result<String, ScanError> {
        debug!(command = %self.frame.name, start = range.start, end = range.end, "nested scan");
        let mut nested = self
            .context
            .nested(range, self.frame.start_line, self.frame.start_column);
        nested.run()
    }

    /// Expand `source`, read from `file`, in a context of its own that
    /// shares this document and storage. Positions start at its first line.
    pub fn process_source(&mut self, source: &str, file: &str) -> Result<String, ScanError> {
        debug!(command = %self.frame.name, %file, "scan of another source");
        self.context.detached(source, file).run()
    }

    pub fn document(&self) -> &Document {
        self.context.document()
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.context.document_mut()
    }

    pub fn storage(&self) -> &Storage {
        self.context.storage()
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        self.context.storage_mut()
    }

    pub fn gensym(&mut self, prefix: &str) -> String {
        self.context.storage_mut().gensym(prefix)
    }

    /// Queue another document, relative to the current document's directory.
    pub fn include(&mut self, path: impl AsRef<Path>) {
        self.context.document_mut().request_include(path);
    }
}
