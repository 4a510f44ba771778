use crate::operators::Operators;
use crate::registry::Registry;

/// Command registry and operator table for one build.
#[derive(Debug, Default)]
pub struct Runtime {
    pub registry: Registry,
    pub operators: Operators,
}

impl Runtime {
    /// Builtin commands and the shipped command-file loaders, default operators.
    pub fn new() -> Self {
        Runtime {
            registry: Registry::with_builtins(),
            operators: Operators::default(),
        }
    }
}
