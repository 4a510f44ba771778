use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::CommandFactory;
use crate::commands;
use crate::error::LoadError;
use crate::template::TemplateLoader;

/// Loads command definitions of one file type from the search path.
pub trait CommandLoader: Send + Sync {
    /// File extension handled, without the dot.
    fn extension(&self) -> &str;

    fn load(&self, name: &str, path: &Path) -> Result<CommandFactory, LoadError>;
}

/// Resolves command names to factories.
///
/// Lookup order: names already resolved, then the search path directories
/// in order (the first directory holding `<name>.<ext>` for a known
/// loader wins), then the statically registered commands. A resolution
/// is cached for the life of the registry.
#[derive(Default)]
pub struct Registry {
    builtins: HashMap<String, CommandFactory>,
    search_path: Vec<PathBuf>,
    loaders: Vec<Box<dyn CommandLoader>>,
    cache: HashMap<String, CommandFactory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builtins: Vec<&str> = self.builtins.keys().map(String::as_str).collect();
        builtins.sort_unstable();
        f.debug_struct("Registry")
            .field("builtins", &builtins)
            .field("search_path", &self.search_path)
            .field("loaders", &self.loaders.iter().map(|l| l.extension()).collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The builtin commands plus the `.toml` template loader.
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        commands::register_builtins(&mut registry);
        registry.add_loader(TemplateLoader);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: CommandFactory) {
        let name = name.into();
        self.cache.remove(&name);
        self.builtins.insert(name, factory);
    }

    pub fn add_loader(&mut self, loader: impl CommandLoader + 'static) {
        self.loaders.push(Box::new(loader));
    }

    pub fn add_search_dir(&mut self, dir: impl Into<PathBuf>) {
        self.search_path.push(dir.into());
    }

    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    pub fn resolve(&mut self, name: &str) -> Result<Option<CommandFactory>, LoadError> {
        if let Some(factory) = self.cache.get(name) {
            return Ok(Some(factory.clone()));
        }

        let factory = match self.find_file(name) {
            Some((loader, path)) => {
                debug!(%name, path = %path.display(), "loading command");
                Some(self.loaders[loader].load(name, &path)?)
            }
            None => self.builtins.get(name).cloned(),
        };

        match &factory {
            Some(factory) => {
                debug!(%name, "resolved command");
                self.cache.insert(name.to_string(), factory.clone());
            }
            None => debug!(%name, "command not found"),
        }
        Ok(factory)
    }

    /// First `(loader index, path)` on the search path defining `name`.
    fn find_file(&self, name: &str) -> Option<(usize, PathBuf)> {
        if name.starts_with('.') || name.contains(['/', '\\']) {
            return None;
        }
        self.search_path
            .iter()
            .filter(|dir| dir.is_dir())
            .find_map(|dir| {
                self.loaders.iter().enumerate().find_map(|(i, loader)| {
                    let candidate = dir.join(format!("{}.{}", name, loader.extension()));
                    candidate.is_file().then_some((i, candidate))
                })
            })
    }
}
