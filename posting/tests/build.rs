use std::fs;
use std::path::{Path, PathBuf};

use posting::{Build, BuildError, BuildOptions, Runtime, ScanErrorKind};
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, text) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    dir
}

fn build(root: &Path, entry: &str, options: BuildOptions) -> Result<Build, BuildError> {
    let mut build = Build::new(root, options, Runtime::new())?;
    build.include(root.join(entry))?;
    build.build_all()?;
    Ok(build)
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

const BLOG: &[(&str, &str)] = &[
    (
        "index.op",
        "@title|Home|@ptag-set|home|\n\
         @begin ptag-filter\n\
         lang(~l)\n\
         @end ptag-filter\n\
         @include-dir|posts|\n",
    ),
    ("posts/a.op", "@title|Alpha & Co|\n@ptag-set|lang(rust)|\nA\n"),
    ("posts/b.op", "@ptag-set|lang(go)|\n@ptag-filter|_|\n"),
    ("posts/c.op", "@ptag-set|draft|\n"),
];

#[test]
fn builds_every_included_document() {
    let dir = project(BLOG);
    let build = build(dir.path(), "index.op", BuildOptions::default()).unwrap();

    let paths: Vec<_> = build.documents().iter().map(|doc| doc.relative_path.as_str()).collect();
    assert_eq!(paths, ["index.op", "posts/a.op", "posts/b.op", "posts/c.op"]);
    assert_eq!(read(dir.path(), "out/posts/a.html"), "\n\nA\n");
}

#[test]
fn index_lists_matching_documents() {
    let dir = project(BLOG);
    build(dir.path(), "index.op", BuildOptions::default()).unwrap();

    assert_eq!(
        read(dir.path(), "out/index.html"),
        "\n<ul id=\"filtered-index-0\">\
         <li><a href=\"posts/a.html\">Alpha &amp; Co</a></li>\
         <li><a href=\"posts/b.html\">b.html</a></li>\
         </ul>\n"
    );
}

#[test]
fn index_links_are_relative_to_the_querying_document() {
    let dir = project(BLOG);
    build(dir.path(), "index.op", BuildOptions::default()).unwrap();

    let b = read(dir.path(), "out/posts/b.html");
    assert!(b.contains("<li><a href=\"../index.html\">Home</a></li>"), "{b}");
    assert!(b.contains("<li><a href=\"a.html\">Alpha &amp; Co</a></li>"), "{b}");
    assert!(b.contains("<li><a href=\"c.html\">c.html</a></li>"), "{b}");
}

#[test]
fn index_format_applies_to_all_documents() {
    let mut files = BLOG.to_vec();
    files[0] = (
        "index.op",
        "@set-index-format|{title} [{path}]|\n@ptag-filter|lang(_)|\n@include-dir|posts|\n",
    );
    let dir = project(&files);
    build(dir.path(), "index.op", BuildOptions::default()).unwrap();

    let index = read(dir.path(), "out/index.html");
    assert!(index.contains(">Alpha &amp; Co [posts/a.op]</a>"), "{index}");
    assert!(index.contains(">b.html [posts/b.op]</a>"), "{index}");
}

#[test]
fn captures_leak_across_candidates_of_one_query() {
    let dir = project(&[
        (
            "index.op",
            "@ptag-filter|[~x, 1] or P[_ == 'second' and x == 'a']|\n@include|a.op|\n@include|b.op|\n",
        ),
        ("a.op", "@ptag-set|[a, 2]|\n"),
        ("b.op", "@ptag-set|second|\n@ptag-filter|P[x == 'a']|\n"),
    ]);
    build(dir.path(), "index.op", BuildOptions::default()).unwrap();

    // `x` is bound while a.op fails to match and is still bound for b.op.
    let index = read(dir.path(), "out/index.html");
    assert!(index.contains("b.html") && !index.contains("a.html"), "{index}");
    // Every query starts from an empty scope.
    assert_eq!(read(dir.path(), "out/b.html"), "\n<ul id=\"filtered-index-1\"></ul>\n");
}

#[test]
fn duplicate_includes_are_built_once() {
    let dir = project(&[
        ("index.op", "@include|a.op|@include|./a.op|@include|index.op|"),
        ("a.op", "@include|index.op|"),
    ]);
    let build = build(dir.path(), "index.op", BuildOptions::default()).unwrap();
    assert_eq!(build.documents().len(), 2);
}

#[test]
fn options_control_output_location() {
    let dir = project(&[("page.op", "hi")]);
    let options = BuildOptions {
        out_dir: PathBuf::from("public"),
        suffix: "htm".into(),
        ..BuildOptions::default()
    };
    build(dir.path(), "page.op", options).unwrap();
    assert_eq!(read(dir.path(), "public/page.htm"), "hi");
}

#[test]
fn existing_outputs_need_force() {
    let dir = project(&[("page.op", "new"), ("out/page.html", "old")]);
    build(dir.path(), "page.op", BuildOptions::default()).unwrap();
    assert_eq!(read(dir.path(), "out/page.html"), "old");

    let force = BuildOptions {
        force: true,
        ..BuildOptions::default()
    };
    build(dir.path(), "page.op", force).unwrap();
    assert_eq!(read(dir.path(), "out/page.html"), "new");
}

#[test]
fn check_mode_writes_nothing() {
    let dir = project(BLOG);
    let check = BuildOptions {
        write: false,
        ..BuildOptions::default()
    };
    let build = build(dir.path(), "index.op", check).unwrap();
    assert!(build.documents()[0].code.contains("posts/a.html"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn project_root_is_stored() {
    let dir = project(&[("index.op", "@include|a.op|"), ("a.op", "")]);
    let build = build(dir.path(), "index.op", BuildOptions::default()).unwrap();
    let root = build.storage().get_str(posting::storage::ROOT_DIR).unwrap();
    assert_eq!(Path::new(root), build.project_root());
}

#[test]
fn scan_error_aborts_the_build() {
    let dir = project(&[("index.op", "@include|a.op|"), ("a.op", "@begin md\n")]);
    match build(dir.path(), "index.op", BuildOptions::default()) {
        Err(BuildError::Scan(err)) => {
            assert!(matches!(err.kind, ScanErrorKind::UnterminatedBlock { .. }));
            assert!(err.file.ends_with("a.op"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("build should fail"),
    }
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_include_is_an_io_error() {
    let dir = project(&[("index.op", "@include|nope.op|")]);
    assert!(matches!(
        build(dir.path(), "index.op", BuildOptions::default()),
        Err(BuildError::Io { .. })
    ));
}
