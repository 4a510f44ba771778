use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use posting::{Document, Runtime, ScanError, Storage, expand};
use ptag::Value;

const TEST_SUFFIX: &str = ".test.op";

/// Directory next to the test files holding `.toml` commands for them.
const COMMANDS_DIR: &str = "commands";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Expected expansion (trimmed comparison).
    #[serde(default)]
    pub expect_output: Option<String>,

    /// The error and its causes, joined by ": ", must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Tags the document must end up with, in order, as ptag expressions.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Split a `.test.op` file into its TOML front matter and the source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- front matter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close = after_open
        .find("\n---")
        .ok_or("missing closing --- front matter delimiter")?;
    let front = after_open[..close].trim_end_matches('\r');
    let rest = &after_open[close + 4..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig = toml::from_str(front).map_err(|e| format!("TOML parse error: {}", e))?;
    Ok((config, source))
}

/// `error: cause: cause...`, the text `expect_error` is matched against.
fn error_chain(error: &ScanError) -> String {
    std::iter::once(error.to_string())
        .chain(error.causes())
        .collect::<Vec<_>>()
        .join(": ")
}

fn check_tags(expected: &[String], actual: &[Value]) -> Result<(), String> {
    let expected = expected
        .iter()
        .map(|source| ptag::build_expression(source).map_err(|e| format!("bad expected tag '{}': {}", source, e)))
        .collect::<Result<Vec<_>, _>>()?;
    if expected == actual {
        return Ok(());
    }
    let show = |tags: &[Value]| {
        tags.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    };
    Err(format!(
        "tag mismatch\n  expected: {}\n  actual:   {}",
        show(&expected),
        show(actual)
    ))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match evaluate(path) {
        Ok(description) => (description, TestOutcome::Pass),
        Err((description, reason)) => (description, TestOutcome::Fail(reason)),
    };
    TestResult {
        path: path.to_path_buf(),
        description,
        outcome,
    }
}

/// Run one test file. Both arms carry the test's description, if known.
fn evaluate(path: &Path) -> Result<Option<String>, (Option<String>, String)> {
    let content = std::fs::read_to_string(path).map_err(|e| (None, format!("cannot read file: {}", e)))?;
    let (config, source) = parse_test_file(&content).map_err(|e| (None, format!("front matter error: {}", e)))?;
    let description = config.description.clone();
    let fail = |reason: String| (description.clone(), reason);

    let mut runtime = Runtime::new();
    if let Some(dir) = path.parent() {
        runtime.registry.add_search_dir(dir.join(COMMANDS_DIR));
    }
    let mut storage = Storage::new();
    let mut doc = Document::standalone(path);
    let file = path.display().to_string();
    let result = expand(source, &file, &mut runtime, &mut storage, &mut doc);

    match (&config.expect_error, &config.expect_output, result) {
        (Some(expected), _, Err(error)) => {
            let actual = error_chain(&error);
            if !actual.contains(expected.as_str()) {
                return Err(fail(format!(
                    "expected error containing \"{}\", got: {}",
                    expected, actual
                )));
            }
        }
        (Some(expected), _, Ok(_)) => {
            return Err(fail(format!(
                "expected error containing \"{}\", but expansion succeeded",
                expected
            )));
        }
        (None, _, Err(error)) => {
            return Err(fail(format!("unexpected error: {}", error_chain(&error))));
        }
        (None, Some(expected), Ok(output)) => {
            let (expected, actual) = (expected.trim(), output.trim());
            if expected != actual {
                return Err(fail(format!(
                    "output mismatch\n  expected: {}\n  actual:   {}",
                    expected, actual
                )));
            }
        }
        (None, None, Ok(_)) => {}
    }

    if let Some(expected) = &config.tags {
        check_tags(expected, &doc.tags).map_err(fail)?;
    }
    Ok(description)
}

/// Discover `.test.op` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(TEST_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

/// Select the categories to run. Unknown names are reported and skipped.
fn select<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for name in requested {
        let name = name.trim_matches('/');
        let prefix = format!("{}/", name);
        let before = selected.len();
        for (cat, files) in all {
            if cat == name || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            let available: Vec<&str> = all.keys().map(|k| category_label(k)).collect();
            eprintln!(
                "warning: category '{}' not found (available: {})",
                name,
                available.join(", ")
            );
        }
    }
    selected
}

/// Run all `.test.op` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let all = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all.is_empty() {
        eprintln!("no {} files found in {}", TEST_SUFFIX, path.display());
        return 1;
    }

    let selected = if path.is_file() { select(&all, &[]) } else { select(&all, categories) };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", bold(category_label(cat), no_color));
        }

        for file in *files {
            let result = run_single_test(file);
            let label = result
                .description
                .clone()
                .or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "?".to_string());

            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", pass_label(no_color), label);
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", fail_label(no_color), label);
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        eprintln!("test result: {}. {} passed, 0 failed", ok, passed);
        0
    } else {
        let status = if no_color { "FAILED" } else { "\x1b[31mFAILED\x1b[0m" };
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            status,
            passed,
            failed,
            passed + failed
        );
        1
    }
}
