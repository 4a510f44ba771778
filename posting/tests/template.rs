use std::fs;

use posting::{Document, Runtime, Storage, Template, TemplateError, expand};
use rstest::rstest;
use tempfile::TempDir;

fn render(template: &str, pairs: &[(&str, &str)]) -> Result<String, TemplateError> {
    Template::parse(template)?.render(|name| {
        pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
}

#[test]
fn placeholders_are_substituted() {
    assert_eq!(
        render("<a href=\"{href}\">{ title }</a>", &[("href", "x.html"), ("title", "X")]).unwrap(),
        "<a href=\"x.html\">X</a>"
    );
}

#[test]
fn doubled_braces_are_literal() {
    assert_eq!(render("{{{title}}}", &[("title", "t")]).unwrap(), "{t}");
}

#[rstest]
#[case::unclosed("a {title", TemplateError::Unclosed(2))]
#[case::stray_close("a } b", TemplateError::UnmatchedClose(2))]
fn malformed_templates(#[case] text: &str, #[case] expected: TemplateError) {
    assert_eq!(Template::parse(text), Err(expected));
}

#[test]
fn unknown_placeholder_fails_render_and_check() {
    assert_eq!(render("{nope}", &[]), Err(TemplateError::Unknown("nope".into())));
    let template = Template::parse("{title} {nope}").unwrap();
    assert_eq!(
        template.check(|name| name == "title"),
        Err(TemplateError::Unknown("nope".into()))
    );
    assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["title", "nope"]);
}

struct Project {
    dir: TempDir,
    runtime: Runtime,
}

impl Project {
    fn new(commands: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        for (name, text) in commands {
            fs::write(dir.path().join(format!("{name}.toml")), text).unwrap();
        }
        let mut runtime = Runtime::new();
        runtime.registry.add_search_dir(dir.path());
        Project { dir, runtime }
    }

    fn expand(&mut self, source: &str) -> String {
        let mut storage = Storage::new();
        let mut doc = Document::standalone(self.dir.path().join("page.op"));
        expand(source, "page.op", &mut self.runtime, &mut storage, &mut doc).unwrap()
    }
}

#[test]
fn template_command_block() {
    let mut project = Project::new(&[("note", r#"template = "<aside class=\"{0}\">{content}</aside>""#)]);
    assert_eq!(
        project.expand("@begin note warn\n**x** @plain|y|\n@end note\n"),
        "<aside class=\"warn\">**x** y\n</aside>"
    );
}

#[test]
fn template_command_arguments() {
    let mut project = Project::new(&[("args", "template = '{args}|{1}|{5}|{file}'")]);
    assert_eq!(project.expand("@begin args a b c\n@end args\n"), "a b c|b||page.op");
}

#[test]
fn inline_template_is_used_inline() {
    let mut project = Project::new(&[(
        "tip",
        "template = '<div>{content}</div>'\ninline_template = '<span>{content}</span>'",
    )]);
    assert_eq!(project.expand("@tip|hi|"), "<span>hi</span>");
    assert_eq!(project.expand("@begin tip\nhi\n@end tip\n"), "<div>hi\n</div>");
}

#[test]
fn block_template_is_the_inline_fallback() {
    let mut project = Project::new(&[("em", "template = '<em>{content}</em>'")]);
    assert_eq!(project.expand("@em|hi|"), "<em>hi</em>");
}

#[test]
fn unexpanded_content_is_raw() {
    let mut project = Project::new(&[("code", "template = '<pre>{content}</pre>'\nexpand = false")]);
    assert_eq!(project.expand("@begin code\n@plain|x|\n@end code\n"), "<pre>@plain|x|\n</pre>");
}
