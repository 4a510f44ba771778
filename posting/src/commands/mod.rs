//! Builtin commands.

mod include;
mod index;
mod markdown;
mod plain;
mod tags;

pub use include::{Include, IncludeDir, RawInclude};
pub use index::{SetIndexFormat, Title, index_entry, index_template};
pub use markdown::Markdown;
pub use plain::Plain;
pub use tags::{TagFilter, TagSet};

use crate::command::factory;
use crate::registry::Registry;

pub fn register_builtins(registry: &mut Registry) {
    registry.register("plain", factory(|_| Box::new(Plain)));
    registry.register("md", factory(|_| Box::new(Markdown)));
    registry.register("ptag-set", factory(|_| Box::new(TagSet)));
    registry.register("ptag-filter", factory(|_| Box::new(TagFilter)));
    registry.register("set-index-format", factory(|_| Box::new(SetIndexFormat)));
    registry.register("title", factory(|_| Box::new(Title)));
    registry.register("include", factory(|_| Box::new(Include)));
    registry.register("include-dir", factory(|_| Box::new(IncludeDir)));
    registry.register("raw-include", factory(|_| Box::new(RawInclude)));
}
