//! The ptag language: a small expression grammar used to attach structured
//! tags to documents and to query them.
//!
//! The same surface syntax compiles in two directions:
//!
//! - as an *expression* it builds a [`Value`] (`lang(rust)` becomes the
//!   call-value `{function: "lang", args: ["rust"]}`),
//! - as a *pattern* it becomes a [`Pattern`], a reusable predicate that can
//!   bind captures (`lang(~name)`), splat list tails (`[1, *~rest]`) and
//!   escape into boolean guards (`P[_ == 'c']`).

pub mod ast;
pub mod compile;
pub mod guard;
pub mod matching;
pub mod parser;
pub mod value;

pub use compile::{
    Pattern, build_expression, build_expressions, compile_conjunction, compile_pattern,
    compile_patterns,
};
pub use matching::{CaptureScope, match_any, match_one, match_tag};
pub use parser::{CompileError, CompileErrorKind};
pub use value::Value;
