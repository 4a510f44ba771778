//! `{placeholder}` templates and the `.toml` command loader built on them.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::command::{Command, CommandFactory, Invocation, factory};
use crate::error::{BoxError, LoadError};
use crate::registry::CommandLoader;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at byte {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at byte {0}; write '}}}}' for a literal brace")]
    UnmatchedClose(usize),
    #[error("unknown placeholder {{{0}}}")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(String),
}

/// Text with `{name}` placeholders. `{{` and `}}` are literal braces.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(text: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let close = text[i..].find('}').ok_or(TemplateError::Unclosed(i))?;
                    let name = text[i + 1..i + close].trim();
                    if !literal.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                    while chars.next_if(|&(j, _)| j <= i + close).is_some() {}
                }
                '}' => return Err(TemplateError::UnmatchedClose(i)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Text(literal));
        }
        Ok(Template { segments })
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Fail on the first placeholder `known` rejects.
    pub fn check(&self, known: impl Fn(&str) -> bool) -> Result<(), TemplateError> {
        match self.placeholders().find(|name| !known(name)) {
            Some(name) => Err(TemplateError::Unknown(name.to_string())),
            None => Ok(()),
        }
    }

    pub fn render(&self, mut lookup: impl FnMut(&str) -> Option<String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = lookup(name).ok_or_else(|| TemplateError::Unknown(name.clone()))?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}

fn default_expand() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    template: String,
    #[serde(default)]
    inline_template: Option<String>,
    #[serde(default = "default_expand")]
    expand: bool,
}

#[derive(Debug)]
struct TemplateDef {
    block: Template,
    inline: Option<Template>,
    expand: bool,
}

/// Placeholders a command template may use.
fn is_command_placeholder(name: &str) -> bool {
    matches!(name, "content" | "args" | "file") || name.parse::<usize>().is_ok()
}

/// Loads declarative commands from `<name>.toml`:
///
/// ```toml
/// template = "<aside class=\"{0}\">{content}</aside>"
/// inline_template = "<span class=\"note\">{content}</span>"
/// expand = true
/// ```
///
/// Placeholders are `{content}`, `{args}` (space separated), `{0}`.. for
/// single arguments, and `{file}`. With `expand = false` the content is
/// inserted raw instead of being expanded first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateLoader;

impl CommandLoader for TemplateLoader {
    fn extension(&self) -> &str {
        "toml"
    }

    fn load(&self, _name: &str, path: &Path) -> Result<CommandFactory, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let invalid = |reason: String| LoadError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        let file: TemplateFile = toml::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        let parse = |text: &str| {
            let template = Template::parse(text).map_err(|e| invalid(e.to_string()))?;
            template
                .check(is_command_placeholder)
                .map_err(|e| invalid(e.to_string()))?;
            Ok::<_, LoadError>(template)
        };
        let def = Arc::new(TemplateDef {
            block: parse(&file.template)?,
            inline: file.inline_template.as_deref().map(parse).transpose()?,
            expand: file.expand,
        });

        Ok(factory(move |_| {
            Box::new(TemplateCommand {
                def: Arc::clone(&def),
            })
        }))
    }
}

struct TemplateCommand {
    def: Arc<TemplateDef>,
}

impl TemplateCommand {
    fn render(
        &self,
        template: &Template,
        inv: &mut Invocation<'_, '_>,
        args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let content = if self.def.expand {
            inv.process_nest(content)?
        } else {
            inv.text(content).to_string()
        };
        let file = inv.file();
        let rendered = template.render(|name| match name {
            "content" => Some(content.clone()),
            "args" => Some(args.join(" ")),
            "file" => Some(file.to_string()),
            index => index
                .parse::<usize>()
                .ok()
                .map(|i| args.get(i).cloned().unwrap_or_default()),
        })?;
        Ok(rendered)
    }
}

impl Command for TemplateCommand {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let def = Arc::clone(&self.def);
        self.render(&def.block, inv, args, content)
    }

    fn inline(&mut self, inv: &mut Invocation<'_, '_>, content: Range<usize>) -> Result<String, BoxError> {
        let def = Arc::clone(&self.def);
        let template = def.inline.as_ref().unwrap_or(&def.block);
        self.render(template, inv, &[], content)
    }
}
