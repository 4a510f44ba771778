use std::ops::Range;

use crate::command::{Command, Invocation};
use crate::document::Document;
use crate::error::BoxError;
use crate::storage::{INDEX_FORMAT, Storage};
use crate::template::Template;

fn is_index_placeholder(name: &str) -> bool {
    matches!(name, "title" | "path" | "href")
}

/// `set-index-format`: how later index entries are displayed.
///
/// The content is a template over `{title}`, `{path}` (the project
/// relative source path) and `{href}`. It applies to every index resolved
/// after the build, whichever document set it last.
pub struct SetIndexFormat;

impl Command for SetIndexFormat {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let format = inv.process_nest(content)?.trim().to_string();
        Template::parse(&format)?.check(is_index_placeholder)?;
        inv.storage_mut().set(INDEX_FORMAT, format);
        Ok(String::new())
    }
}

/// `title`: set the current document's title.
pub struct Title;

impl Command for Title {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let title = inv.process_nest(content)?.trim().to_string();
        inv.document_mut().title = title;
        Ok(String::new())
    }
}

/// The configured index format, if one was set.
pub fn index_template(storage: &Storage) -> Option<Template> {
    storage.get_str(INDEX_FORMAT).and_then(|format| Template::parse(format).ok())
}

/// One `<li>` entry linking to `doc`.
pub fn index_entry(template: Option<&Template>, doc: &Document, href: &str) -> String {
    let display = template
        .and_then(|template| {
            template
                .render(|name| match name {
                    "title" => Some(doc.display_title()),
                    "path" => Some(doc.relative_path.clone()),
                    "href" => Some(href.to_string()),
                    _ => None,
                })
                .ok()
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| doc.display_title());
    format!(
        "<li><a href=\"{}\">{}</a></li>",
        escape_html(href),
        escape_html(&display)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
