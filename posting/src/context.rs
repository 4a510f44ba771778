//! The macro engine: a single-pass scanner over one source buffer.
//!
//! A [`Context`] walks its range of the source and copies ordinary text to
//! the output. Directives are expanded as they are met:
//!
//! - `@begin name args...` opens a scope; its content is consumed until a
//!   matching `@end name` and then handed to the command's
//!   [`full_block`](crate::Command::full_block).
//! - `@name|...|` (or with a wider pipe run, `@name||...||`) calls the
//!   command's [`inline`](crate::Command::inline) operation.
//! - `@(...)`, `@[...]` and `@{...}` call the bracket operators.
//! - `\@` is a literal `@`.
//!
//! A context holds at most one open scope. Nesting is handled by commands
//! asking for a nested scan of part of their content, which runs in a new
//! context over the same buffer.

use std::ops::Range;

use tracing::trace;

use crate::command::{Command, CommandFactory, Invocation};
use crate::document::Document;
use crate::error::{ScanError, ScanErrorKind};
use crate::operators::Bracket;
use crate::runtime::Runtime;
use crate::shell;
use crate::storage::Storage;
use crate::text::{advance_position, contains_terminator, excerpt, find_line_end, find_match, terminator_len};

const BEGIN: &str = "@begin";
const END: &str = "@end";
const ESCAPE: &str = "\\@";

/// The build state a scan reads and writes.
pub struct Session<'a> {
    pub runtime: &'a mut Runtime,
    pub storage: &'a mut Storage,
    pub document: &'a mut Document,
}

impl Session<'_> {
    fn reborrow(&mut self) -> Session<'_> {
        Session {
            runtime: &mut *self.runtime,
            storage: &mut *self.storage,
            document: &mut *self.document,
        }
    }
}

/// Where a directive and its content begin. Lines and columns are 0-based.
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub args: Vec<String>,
    /// Offset of the directive's `@`.
    pub directive: usize,
    pub directive_line: usize,
    pub directive_column: usize,
    pub content_start: usize,
    pub start_line: usize,
    pub start_column: usize,
}

struct Scope {
    frame: Frame,
    command: Box<dyn Command>,
}

/// Scan state over `source[pos..end]`.
pub struct Context<'a> {
    source: &'a str,
    file: &'a str,
    end: usize,
    pos: usize,
    line: usize,
    column: usize,
    scope: Option<Scope>,
    session: Session<'a>,
}

/// Expand a whole document.
pub fn expand(
    source: &str,
    file: &str,
    runtime: &mut Runtime,
    storage: &mut Storage,
    document: &mut Document,
) -> Result<String, ScanError> {
    let session = Session {
        runtime,
        storage,
        document,
    };
    Context::new(source, file, session).run()
}

impl<'a> Context<'a> {
    pub fn new(source: &'a str, file: &'a str, session: Session<'a>) -> Self {
        Context {
            source,
            file,
            end: source.len(),
            pos: 0,
            line: 0,
            column: 0,
            scope: None,
            session,
        }
    }

    /// A fresh context over `range` of the same source, sharing the session.
    pub(crate) fn nested(&mut self, range: Range<usize>, line: usize, column: usize) -> Context<'_> {
        let end = range.end.min(self.source.len());
        let start = range.start.min(end);
        Context {
            source: self.source,
            file: self.file,
            end,
            pos: start,
            line,
            column,
            scope: None,
            session: self.session.reborrow(),
        }
    }

    /// A fresh context over another buffer, sharing the session.
    pub(crate) fn detached<'s>(&'s mut self, source: &'s str, file: &'s str) -> Context<'s> {
        Context::new(source, file, self.session.reborrow())
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn text(&self, range: Range<usize>) -> &'a str {
        &self.source[range]
    }

    pub fn file(&self) -> &'a str {
        self.file
    }

    /// Byte offset of the scan position.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// 0-based line of the scan position.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 0-based column of the scan position, in characters.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn document(&self) -> &Document {
        &*self.session.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut *self.session.document
    }

    pub fn storage(&self) -> &Storage {
        &*self.session.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut *self.session.storage
    }

    /// Scan to the end of the range and return the output.
    pub fn run(&mut self) -> Result<String, ScanError> {
        let mut out = String::new();
        while self.step(&mut out)? {}

        if let Some(Scope { frame, .. }) = self.scope.take() {
            let line_end = find_line_end(self.source, frame.directive, self.end).0;
            return Err(self.error_at(
                ScanErrorKind::UnterminatedBlock { name: frame.name },
                frame.directive..line_end,
                frame.directive_line,
                frame.directive_column,
            ));
        }
        Ok(out)
    }

    /// Consume one character or one directive. Returns false at the end.
    fn step(&mut self, out: &mut String) -> Result<bool, ScanError> {
        while self.rest().starts_with(ESCAPE) {
            if self.scope.is_none() {
                out.push('@');
            }
            self.pos += ESCAPE.len();
            self.column += ESCAPE.len();
        }
        if self.pos >= self.end {
            return Ok(false);
        }

        if self.scope.is_some() {
            if self.rest().starts_with(END) && self.end_scope(out)? {
                return Ok(true);
            }
            self.consume_char(None);
            return Ok(true);
        }

        if self.rest().starts_with(BEGIN) {
            self.begin_scope()?;
            return Ok(true);
        }
        if self.rest().starts_with('@') && (self.bracket_operator(out)? || self.inline_command(out)?) {
            return Ok(true);
        }

        self.consume_char(Some(out));
        Ok(true)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..self.end]
    }

    /// Consume one character, or one whole line terminator.
    fn consume_char(&mut self, out: Option<&mut String>) {
        let terminator = terminator_len(self.source, self.pos, self.end);
        let width = if terminator > 0 {
            terminator
        } else {
            self.rest().chars().next().map_or(1, char::len_utf8)
        };
        if let Some(out) = out {
            out.push_str(&self.source[self.pos..self.pos + width]);
        }
        if terminator > 0 {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        self.pos += width;
    }

    fn begin_scope(&mut self) -> Result<(), ScanError> {
        let directive = self.pos;
        let args_start = directive + BEGIN.len();
        let (line_end, next) = find_line_end(self.source, args_start, self.end);
        let span = directive..line_end;

        let mut args = shell::split(&self.source[args_start..line_end])
            .map_err(|e| self.error(ScanErrorKind::InvalidArguments(e.to_string()), span.clone()))?;
        if args.is_empty() {
            return Err(self.error(ScanErrorKind::EmptyBeginArgs, span));
        }
        let name = args.remove(0);
        let factory = self.resolve(&name, span)?;
        let command = factory(&*self);
        trace!(%name, ?args, line = self.line + 1, "@begin");

        let frame = Frame {
            name,
            args,
            directive,
            directive_line: self.line,
            directive_column: self.column,
            content_start: next,
            start_line: self.line + 1,
            start_column: 0,
        };
        self.pos = next;
        self.line += 1;
        self.column = 0;
        self.scope = Some(Scope { frame, command });
        Ok(())
    }

    /// Close the open scope if `@end` names it.
    fn end_scope(&mut self, out: &mut String) -> Result<bool, ScanError> {
        let directive = self.pos;
        let name_start = directive + END.len();
        let (line_end, next) = find_line_end(self.source, name_start, self.end);
        let name = self.source[name_start..line_end].trim();

        let Some(open) = self.scope.as_ref().map(|scope| scope.frame.name.as_str()) else {
            return Ok(false);
        };
        if name.is_empty() {
            return Err(self.error(
                ScanErrorKind::EmptyEndName { open: open.to_string() },
                directive..line_end,
            ));
        }
        if name != open {
            return Ok(false);
        }

        let Some(Scope { frame, mut command }) = self.scope.take() else {
            return Ok(false);
        };
        trace!(name = %frame.name, line = self.line + 1, "@end");
        let content = frame.content_start..directive;
        let result = {
            let mut inv = Invocation::new(self, &frame);
            command.full_block(&mut inv, &frame.args, content)
        };
        let text = result.map_err(|cause| {
            self.error(
                ScanErrorKind::CommandFailed {
                    name: frame.name.clone(),
                    args: frame.args.clone(),
                    cause,
                },
                directive..line_end,
            )
        })?;

        out.push_str(&text);
        self.pos = next;
        self.line += 1;
        self.column = 0;
        Ok(true)
    }

    fn bracket_operator(&mut self, out: &mut String) -> Result<bool, ScanError> {
        let at = self.pos;
        for bracket in Bracket::ALL {
            let mut open = [0; 4];
            let mut close = [0; 4];
            let found = find_match(
                bracket.open().encode_utf8(&mut open),
                bracket.close().encode_utf8(&mut close),
                &bracket.escapes(),
                self.source,
                at + 1,
                self.end,
            );
            let Some((inner, after)) = found else {
                continue;
            };

            if contains_terminator(&self.source[inner.clone()]) {
                return Err(self.error(
                    ScanErrorKind::UnexpectedNewline {
                        open: bracket.open(),
                        close: bracket.close(),
                    },
                    at..after,
                ));
            }

            let handler = self.session.runtime.operators.get(bracket).clone();
            let text = handler(&mut *self, inner).map_err(|cause| {
                self.error(
                    ScanErrorKind::OperatorFailed {
                        open: bracket.open(),
                        close: bracket.close(),
                        cause,
                    },
                    at..after,
                )
            })?;
            out.push_str(&text);
            self.column += self.source[at..after].chars().count();
            self.pos = after;
            return Ok(true);
        }
        Ok(false)
    }

    fn inline_command(&mut self, out: &mut String) -> Result<bool, ScanError> {
        let at = self.pos;
        let header = &self.source[at + 1..self.end];
        let name_len = header
            .find(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n' | '|'))
            .unwrap_or(header.len());
        if name_len == 0 || !header[name_len..].starts_with('|') {
            return Ok(false);
        }
        let name = &header[..name_len];
        let width = header[name_len..].bytes().take_while(|&b| b == b'|').count();
        let content_start = at + 1 + name_len + width;

        let delimiter = "|".repeat(width);
        let Some(rel) = self.source[content_start..self.end].find(&delimiter) else {
            let shown = self.source[content_start..self.end]
                .char_indices()
                .nth(10)
                .map_or(self.end, |(i, _)| content_start + i);
            return Err(self.error(
                ScanErrorKind::UnterminatedInline {
                    name: name.to_string(),
                    width,
                },
                at..shown,
            ));
        };
        let content_end = content_start + rel;
        let after = content_end + width;

        let factory = self.resolve(name, at..content_start)?;
        let mut command = factory(&*self);
        trace!(%name, width, line = self.line + 1, "inline command");

        let (start_line, start_column) = advance_position(&self.source[at..content_start], self.line, self.column);
        let frame = Frame {
            name: name.to_string(),
            args: Vec::new(),
            directive: at,
            directive_line: self.line,
            directive_column: self.column,
            content_start,
            start_line,
            start_column,
        };
        // The scope lives only for this call; it is gone whether or not the
        // command succeeds.
        let result = {
            let mut inv = Invocation::new(self, &frame);
            command.inline(&mut inv, content_start..content_end)
        };
        let text = result.map_err(|cause| {
            self.error(
                ScanErrorKind::CommandFailed {
                    name: frame.name.clone(),
                    args: Vec::new(),
                    cause,
                },
                at..after,
            )
        })?;

        out.push_str(&text);
        let (line, column) = advance_position(&self.source[at..after], self.line, self.column);
        self.line = line;
        self.column = column;
        self.pos = after;
        Ok(true)
    }

    fn resolve(&mut self, name: &str, span: Range<usize>) -> Result<CommandFactory, ScanError> {
        match self.session.runtime.registry.resolve(name) {
            Ok(Some(factory)) => Ok(factory),
            Ok(None) => Err(self.error(ScanErrorKind::UnknownCommand(name.to_string()), span)),
            Err(cause) => Err(self.error(
                ScanErrorKind::CommandLoad {
                    name: name.to_string(),
                    cause,
                },
                span,
            )),
        }
    }

    fn error(&self, kind: ScanErrorKind, span: Range<usize>) -> ScanError {
        self.error_at(kind, span, self.line, self.column)
    }

    fn error_at(&self, kind: ScanErrorKind, span: Range<usize>, line: usize, column: usize) -> ScanError {
        ScanError {
            excerpt: excerpt(self.source, &span),
            kind,
            file: self.file.to_string(),
            line: line + 1,
            column: column + 1,
            span,
        }
    }
}
