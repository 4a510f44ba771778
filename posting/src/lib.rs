//! A macro-expanding static site builder.
//!
//! Source documents are plain text with embedded directives (see
//! [`context`]). Each directive names a [`Command`] found through the
//! [`Registry`]; commands can attach ptag tags to their document and emit
//! tag-filtered indexes of the whole build.

pub mod build;
pub mod command;
pub mod commands;
pub mod context;
pub mod document;
pub mod error;
pub mod operators;
pub mod registry;
pub mod runtime;
pub mod shell;
pub mod storage;
pub mod template;
pub mod text;

pub use build::{Build, BuildOptions};
pub use command::{Command, CommandFactory, Invocation, factory};
pub use context::{Context, Frame, Session, expand};
pub use document::{Document, IndexQuery};
pub use error::{BoxError, BuildError, LoadError, ScanError, ScanErrorKind};
pub use operators::{Bracket, OperatorFn, Operators, operator};
pub use registry::{CommandLoader, Registry};
pub use runtime::Runtime;
pub use storage::Storage;
pub use template::{Template, TemplateError, TemplateLoader};
