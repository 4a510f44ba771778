use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Name of the optional project file in the project root.
pub const CONFIG_FILE: &str = "posting.toml";

/// Directory of user commands under the home directory, searched first.
const USER_COMMANDS: &str = ".posting";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Output directory relative to the project root.
    #[serde(default)]
    pub out: Option<PathBuf>,

    /// Output file extension, e.g. ".html".
    #[serde(default)]
    pub suffix: Option<String>,

    /// Overwrite existing outputs.
    #[serde(default)]
    pub force: bool,

    /// Command directories, relative to the project root.
    #[serde(default)]
    pub search_path: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Read `posting.toml` from `project_root`. A missing file is an empty
    /// configuration.
    pub fn load(project_root: &Path) -> Result<ProjectConfig, String> {
        let path = project_root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(ProjectConfig::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        let mut config: ProjectConfig =
            toml::from_str(&text).map_err(|e| format!("invalid {}: {}", path.display(), e))?;
        config.search_path = config
            .search_path
            .iter()
            .map(|dir| project_root.join(dir))
            .collect();
        Ok(config)
    }
}

/// `~/.posting`, if it exists.
pub fn user_commands_dir() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
    let dir = PathBuf::from(home).join(USER_COMMANDS);
    dir.is_dir().then_some(dir)
}
