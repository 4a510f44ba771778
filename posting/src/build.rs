use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};

use ptag::CaptureScope;
use tracing::{debug, info, warn};

use crate::commands::{index_entry, index_template};
use crate::context::expand;
use crate::document::{Document, placeholder};
use crate::error::BuildError;
use crate::runtime::Runtime;
use crate::storage::{ROOT_DIR, Storage};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Output directory, relative to the project root.
    pub out_dir: PathBuf,
    /// Extension of output files, with or without the leading dot.
    pub suffix: String,
    /// Overwrite existing output files.
    pub force: bool,
    /// Write outputs at all; false expands and resolves only.
    pub write: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            out_dir: PathBuf::from("out"),
            suffix: ".html".to_string(),
            force: false,
            write: true,
        }
    }
}

/// A sequential build of a set of documents and everything they include.
///
/// Documents are expanded in the order they were queued, breadth first.
/// All of them share one [`Storage`] and one [`Runtime`].
pub struct Build {
    project_root: PathBuf,
    options: BuildOptions,
    runtime: Runtime,
    storage: Storage,
    queue: VecDeque<Document>,
    seen: HashSet<String>,
    built: Vec<Document>,
}

impl Build {
    pub fn new(project_root: impl AsRef<Path>, options: BuildOptions, runtime: Runtime) -> Result<Self, BuildError> {
        let project_root = canonical(project_root.as_ref())?;
        let mut storage = Storage::new();
        storage.set(ROOT_DIR, project_root.to_string_lossy().into_owned());
        Ok(Build {
            project_root,
            options,
            runtime,
            storage,
            queue: VecDeque::new(),
            seen: HashSet::new(),
            built: Vec::new(),
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Documents built so far, in build order.
    pub fn documents(&self) -> &[Document] {
        &self.built
    }

    /// Queue `file` unless a document with the same project-relative path
    /// was already queued.
    pub fn include(&mut self, file: impl AsRef<Path>) -> Result<(), BuildError> {
        let source_path = canonical(file.as_ref())?;
        let relative = pathdiff::diff_paths(&source_path, &self.project_root).unwrap_or_else(|| source_path.clone());
        let relative_path = slash_path(&relative);
        if !self.seen.insert(relative_path.clone()) {
            debug!(path = %relative_path, "already queued");
            return Ok(());
        }

        let suffix = self.options.suffix.trim_start_matches('.');
        let output_path = self
            .project_root
            .join(&self.options.out_dir)
            .join(&relative)
            .with_extension(suffix);
        debug!(path = %relative_path, "queued");
        self.queue
            .push_back(Document::new(relative_path, source_path, output_path));
        Ok(())
    }

    /// Build every queued document, resolve index queries, then write the
    /// outputs unless writing is disabled.
    pub fn build_all(&mut self) -> Result<(), BuildError> {
        while self.build_next()? {}
        self.resolve_queries();
        if self.options.write {
            self.write_outputs()?;
        }
        Ok(())
    }

    fn build_next(&mut self) -> Result<bool, BuildError> {
        let Some(mut doc) = self.queue.pop_front() else {
            return Ok(false);
        };
        let source = std::fs::read_to_string(&doc.source_path).map_err(|source| BuildError::Io {
            path: doc.source_path.clone(),
            source,
        })?;
        let file = doc.source_path.to_string_lossy().into_owned();

        doc.code = expand(&source, &file, &mut self.runtime, &mut self.storage, &mut doc)?;
        info!(path = %doc.relative_path, tags = doc.tags.len(), "built");

        for include in std::mem::take(&mut doc.includes) {
            self.include(include)?;
        }
        self.built.push(doc);
        Ok(true)
    }

    /// Fill every index placeholder, latest built document first.
    ///
    /// Each query threads one capture scope through all candidate
    /// documents; captures from a non-matching document are kept.
    fn resolve_queries(&mut self) {
        let template = index_template(&self.storage);
        for i in (0..self.built.len()).rev() {
            let queries = std::mem::take(&mut self.built[i].queries);
            if queries.is_empty() {
                continue;
            }
            let base = self.built[i]
                .output_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();

            let mut filled = Vec::with_capacity(queries.len());
            for query in &queries {
                let mut scope = CaptureScope::new();
                let items: String = self
                    .built
                    .iter()
                    .filter(|candidate| candidate.matches(&query.pattern, &mut scope))
                    .map(|candidate| {
                        let href = pathdiff::diff_paths(&candidate.output_path, &base)
                            .map(|path| slash_path(&path))
                            .unwrap_or_else(|| slash_path(&candidate.output_path));
                        index_entry(template.as_ref(), candidate, &href)
                    })
                    .collect();
                debug!(id = %query.id, document = %self.built[i].relative_path, "index resolved");
                filled.push((query.placeholder(), placeholder(&query.id, &items)));
            }

            let doc = &mut self.built[i];
            for (empty, full) in filled {
                doc.code = doc.code.replacen(&empty, &full, 1);
            }
        }
    }

    fn write_outputs(&self) -> Result<(), BuildError> {
        for doc in &self.built {
            let out = &doc.output_path;
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent).map_err(|source| BuildError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            if out.exists() && !self.options.force {
                warn!(
                    path = %out.display(),
                    "output already exists, skipped; use --force to overwrite"
                );
                continue;
            }
            std::fs::write(out, &doc.code).map_err(|source| BuildError::Io {
                path: out.clone(),
                source,
            })?;
            info!(path = %out.display(), "written");
        }
        Ok(())
    }
}

fn canonical(path: &Path) -> Result<PathBuf, BuildError> {
    path.canonicalize().map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `/`-separated form of a relative path.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|component| match component {
            Component::ParentDir => "..".into(),
            Component::CurDir => ".".into(),
            other => other.as_os_str().to_string_lossy(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
