use std::collections::HashMap;

use ptag::Value;

/// Storage key of the index entry template set by `set-index-format`.
pub const INDEX_FORMAT: &str = "index-format";
/// Storage key of the absolute project root, set by the build.
pub const ROOT_DIR: &str = "root-dir";

/// Key/value store shared by every document of one build.
///
/// Values written while expanding one document are visible to every
/// document expanded after it.
#[derive(Debug, Default)]
pub struct Storage {
    values: HashMap<String, Value>,
    next_symbol: u64,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// A name unique within this build: `prefix-0`, `prefix-1`, ...
    pub fn gensym(&mut self, prefix: &str) -> String {
        let n = self.next_symbol;
        self.next_symbol += 1;
        format!("{}-{}", prefix, n)
    }
}
