use std::path::{Path, PathBuf};

use ptag::{CaptureScope, Pattern, Value, match_any};

/// A tag query registered by `ptag-filter`, answered once every document
/// of the build is known.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    /// The `id` of the placeholder list emitted into the document.
    pub id: String,
    pub pattern: Pattern,
}

impl IndexQuery {
    pub fn placeholder(&self) -> String {
        placeholder(&self.id, "")
    }
}

pub(crate) fn placeholder(id: &str, items: &str) -> String {
    format!("<ul id=\"{}\">{}</ul>", id, items)
}

/// One document of a build.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path of the source relative to the project root, `/`-separated.
    pub relative_path: String,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// Directory relative includes are resolved against.
    pub working_dir: PathBuf,
    pub title: String,
    pub tags: Vec<Value>,
    /// Expanded output. Empty until the document is built.
    pub code: String,
    pub queries: Vec<IndexQuery>,
    /// Files requested by `include`, already joined to `working_dir`.
    pub includes: Vec<PathBuf>,
}

impl Document {
    pub fn new(relative_path: impl Into<String>, source_path: PathBuf, output_path: PathBuf) -> Self {
        let working_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Document {
            relative_path: relative_path.into(),
            source_path,
            output_path,
            working_dir,
            title: String::new(),
            tags: Vec::new(),
            code: String::new(),
            queries: Vec::new(),
            includes: Vec::new(),
        }
    }

    /// A document that is expanded on its own, outside a build.
    pub fn standalone(source_path: impl Into<PathBuf>) -> Self {
        let source_path = source_path.into();
        let relative_path = source_path.to_string_lossy().replace('\\', "/");
        let output_path = source_path.with_extension("html");
        Document::new(relative_path, source_path, output_path)
    }

    /// Whether any tag matches `pattern`. `scope` is shared across the
    /// attempts and not rolled back.
    pub fn matches(&self, pattern: &Pattern, scope: &mut CaptureScope) -> bool {
        match_any(pattern, &self.tags, scope)
    }

    /// Title for index entries: the title, or the output file name.
    pub fn display_title(&self) -> String {
        if !self.title.is_empty() {
            return self.title.clone();
        }
        self.output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.relative_path.clone())
    }

    /// Queue `path`, relative to this document's directory, for building.
    pub fn request_include(&mut self, path: impl AsRef<Path>) {
        self.includes.push(self.working_dir.join(path));
    }
}
