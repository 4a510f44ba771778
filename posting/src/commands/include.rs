use std::ops::Range;
use std::path::Path;

use crate::command::{Command, Invocation};
use crate::error::BoxError;

/// Extension of the documents `include-dir` picks up.
const SOURCE_EXTENSION: &str = "op";

/// `@include| path/to/doc.op |`: add a document to the build.
pub struct Include;

impl Command for Include {
    fn full_block(
        &mut self,
        _inv: &mut Invocation<'_, '_>,
        _args: &[String],
        _content: Range<usize>,
    ) -> Result<String, BoxError> {
        Err("use the inline form: @include| dir/doc.op |".into())
    }

    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        let path = inv.process_nest(content)?;
        let path = path.trim();
        if path.is_empty() {
            return Err("include needs a path".into());
        }
        inv.include(path);
        Ok(String::new())
    }
}

/// `include-dir`: add every `.op` document of the listed directories.
///
/// The inline form takes one directory, the block form one per line.
pub struct IncludeDir;

impl IncludeDir {
    fn include_dir(inv: &mut Invocation<'_, '_>, dir: &str) -> Result<(), BoxError> {
        let dir = inv.document().working_dir.join(dir);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| format!("cannot read {}: {}", dir.display(), e))? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        for file in files {
            inv.include(&file);
        }
        Ok(())
    }
}

impl Command for IncludeDir {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let listing = inv.process_nest(content)?;
        for dir in listing.lines().map(str::trim).filter(|line| !line.is_empty()) {
            Self::include_dir(inv, dir)?;
        }
        Ok(String::new())
    }

    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        let dir = inv.process_nest(content)?;
        Self::include_dir(inv, dir.trim())?;
        Ok(String::new())
    }
}

/// `@raw-include| part.op |`: expand another file in place.
///
/// The file is read relative to the document's directory and expanded into
/// the current document. Includes inside it resolve against its own
/// directory while it runs.
pub struct RawInclude;

impl Command for RawInclude {
    fn full_block(
        &mut self,
        _inv: &mut Invocation<'_, '_>,
        _args: &[String],
        _content: Range<usize>,
    ) -> Result<String, BoxError> {
        Err("use the inline form: @raw-include| dir/part.op |".into())
    }

    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        let path = inv.process_nest(content)?;
        let path = path.trim();
        if path.is_empty() {
            return Err("raw-include needs a path".into());
        }

        let file = inv.document().working_dir.join(path);
        let source = std::fs::read_to_string(&file).map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        let saved = std::mem::replace(&mut inv.document_mut().working_dir, dir);
        let result = inv.process_source(&source, &file.display().to_string());
        inv.document_mut().working_dir = saved;
        Ok(result?)
    }
}
