use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// What went wrong while compiling a ptag source block.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("{0} is not supported")]
    Unsupported(String),
    #[error("record keys must be constants")]
    NonConstantKey,
    #[error("duplicate record key '{0}'")]
    DuplicateKey(String),
    #[error("record unpacking is not supported")]
    RecordSplat,
    #[error("keyword arguments are not supported")]
    KeywordArgument,
    #[error("a list pattern may contain at most one starred element")]
    MultipleStarred,
    #[error("starred elements are only allowed inside list patterns")]
    MisplacedStarred,
    #[error("at least one pattern is required")]
    EmptyPatternList,
    #[error("expected a single expression, found {0}")]
    ExpectedSingle(usize),
}

/// Compile errors with source location information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    /// Byte range into the compiled source block.
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Range<usize>) -> Self {
        CompileError {
            kind,
            span,
            notes: Vec::new(),
        }
    }

    pub fn syntax(message: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(CompileErrorKind::Syntax(message.into()), span)
    }

    pub fn unsupported(what: impl Into<String>, span: Range<usize>) -> Self {
        Self::new(CompileErrorKind::Unsupported(what.into()), span)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        Diagnostic::error()
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}
