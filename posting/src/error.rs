use std::error::Error;
use std::fmt;
use std::io;
use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Label};

/// Error type commands and operators report failures with.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Failure to load a command definition from the search path.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid command file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ScanErrorKind {
    #[error("@begin {name} is never closed by '@end {name}'")]
    UnterminatedBlock { name: String },
    #[error("'@end' followed by no command name, did you mean '@end {open}'?")]
    EmptyEndName { open: String },
    #[error("@begin with no command name")]
    EmptyBeginArgs,
    #[error("invalid @begin arguments: {0}")]
    InvalidArguments(String),
    #[error("command {0} is not found")]
    UnknownCommand(String),
    #[error("cannot load command {name}")]
    CommandLoad {
        name: String,
        #[source]
        cause: LoadError,
    },
    #[error("{name} starts with {width} '|' sign(s), but no matching ending was found")]
    UnterminatedInline { name: String, width: usize },
    #[error("unexpected newline in @{open}...{close} operator")]
    UnexpectedNewline { open: char, close: char },
    #[error("{name} failed to process (args: {args:?})")]
    CommandFailed {
        name: String,
        args: Vec<String>,
        #[source]
        cause: BoxError,
    },
    #[error("@{open}...{close} operator failed")]
    OperatorFailed {
        open: char,
        close: char,
        #[source]
        cause: BoxError,
    },
}

/// A fatal error raised while expanding a document.
///
/// `line` and `column` are 1-based; `span` is a byte range into the
/// scanned source.
#[derive(Debug)]
pub struct ScanError {
    pub kind: ScanErrorKind,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub excerpt: String,
    pub span: Range<usize>,
}

impl ScanError {
    /// The chain of underlying causes, outermost first.
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut current = self.kind.source();
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        causes
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let notes = self
            .causes()
            .into_iter()
            .map(|cause| format!("caused by: {}", cause))
            .collect();
        Diagnostic::error()
            .with_message(self.kind.to_string())
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(notes)
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.kind)
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.kind.source()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Scan(#[from] ScanError),
}
