use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn posting(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_posting"))
        .args(args)
        .arg("--no-color")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run posting")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn golden_dir() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/golden")
        .display()
        .to_string()
}

#[test]
fn golden_tests_pass() {
    let output = posting(&["test", &golden_dir()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("0 failed"));
}

#[test]
fn golden_categories_can_be_selected() {
    let output = posting(&["test", &golden_dir(), "--category", "syntax"]);
    let err = stderr(&output);
    assert!(output.status.success(), "{err}");
    assert!(err.contains("5 passed"), "{err}");
}

fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("index.op"),
        "@title|Home|\n@ptag-filter|lang(_)|\n@include|post.op|\n",
    )
    .unwrap();
    fs::write(dir.path().join("post.op"), "@title|Post|@ptag-set|lang(rust)|\n@begin md\n*hi*\n@end md\n").unwrap();
    dir
}

#[test]
fn bare_file_builds() {
    let dir = site();
    let entry = dir.path().join("index.op");
    let output = posting(&[entry.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));

    let index = fs::read_to_string(dir.path().join("out/index.html")).unwrap();
    assert!(index.contains("<li><a href=\"post.html\">Post</a></li>"), "{index}");
    let post = fs::read_to_string(dir.path().join("out/post.html")).unwrap();
    assert_eq!(post, "\n<p><em>hi</em></p>\n");
}

#[test]
fn config_file_and_flags() {
    let dir = site();
    fs::write(dir.path().join("posting.toml"), "out = 'public'\nsuffix = '.htm'\n").unwrap();
    let entry = dir.path().join("index.op");

    let output = posting(&["build", entry.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(dir.path().join("public/post.htm").is_file());

    let output = posting(&["build", entry.to_str().unwrap(), "--out", "site", "--suffix", ".html"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(dir.path().join("site/post.html").is_file());
}

#[test]
fn check_writes_nothing() {
    let dir = site();
    let entry = dir.path().join("index.op");
    let output = posting(&["build", "--check", entry.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("ok: 2 document(s) expanded"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn search_path_flag() {
    let dir = site();
    let commands = dir.path().join("cmds");
    fs::create_dir(&commands).unwrap();
    fs::write(commands.join("shout.toml"), "template = '<b>{content}</b>'").unwrap();
    fs::write(dir.path().join("page.op"), "@shout|hey|").unwrap();

    let entry = dir.path().join("page.op");
    let output = posting(&["build", entry.to_str().unwrap(), "-I", commands.to_str().unwrap()]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read_to_string(dir.path().join("out/page.html")).unwrap(), "<b>hey</b>");
}

#[test]
fn scan_errors_are_rendered() {
    let dir = TempDir::new().unwrap();
    let entry = dir.path().join("bad.op");
    fs::write(&entry, "fine\n@begin md\nnever closed\n").unwrap();

    let output = posting(&["build", entry.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("@begin md is never closed by '@end md'"), "{err}");
    assert!(err.contains("bad.op:2:1"), "{err}");
}

#[test]
fn tag_subcommand() {
    let output = posting(&["tag", "lang(rust); {a: 1}"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "lang(rust)\n{a: 1}\n");

    let output = posting(&["tag", "--pattern", "[*a, *b]"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("at most one starred element"));
}
