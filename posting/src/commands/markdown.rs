use std::ops::Range;

use pulldown_cmark::{Options, Parser, html};

use crate::command::{Command, Invocation};
use crate::error::BoxError;

/// Expands its content and renders it from Markdown to HTML.
///
/// Block arguments name extensions: `tables`, `footnotes`,
/// `strikethrough`, `tasklists`, `smart-punctuation`,
/// `heading-attributes`.
pub struct Markdown;

fn extension(name: &str) -> Option<Options> {
    Some(match name {
        "tables" => Options::ENABLE_TABLES,
        "footnotes" => Options::ENABLE_FOOTNOTES,
        "strikethrough" => Options::ENABLE_STRIKETHROUGH,
        "tasklists" => Options::ENABLE_TASKLISTS,
        "smart-punctuation" => Options::ENABLE_SMART_PUNCTUATION,
        "heading-attributes" => Options::ENABLE_HEADING_ATTRIBUTES,
        _ => return None,
    })
}

impl Command for Markdown {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let mut options = Options::empty();
        for arg in args {
            options |= extension(arg).ok_or_else(|| format!("unknown markdown extension '{}'", arg))?;
        }
        let source = inv.process_nest(content)?;

        let mut out = String::new();
        html::push_html(&mut out, Parser::new_ext(&source, options));
        Ok(out)
    }
}
