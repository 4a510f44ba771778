pub mod error;
pub mod expression;
mod lexer;

pub use error::{CompileError, CompileErrorKind};
pub use expression::{parse_block, parse_single};
