use std::io;
use std::ops::Range;
use std::sync::{Arc, Mutex};

use posting::commands::Plain;
use posting::{
    BoxError, Bracket, Command, Document, Invocation, Runtime, ScanError, ScanErrorKind, Storage, expand, factory,
};

/// Returns its raw content and remembers the arguments it was given.
struct Recorder {
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Command for Recorder {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        self.seen.lock().unwrap().push(args.to_vec());
        Ok(inv.text(content).to_string())
    }
}

/// Expands its content and upper-cases the result.
struct Upper;

impl Command for Upper {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        Ok(inv.process_nest(content)?.to_uppercase())
    }
}

struct Fail;

impl Command for Fail {
    fn full_block(
        &mut self,
        _inv: &mut Invocation<'_, '_>,
        _args: &[String],
        _content: Range<usize>,
    ) -> Result<String, BoxError> {
        Err(Box::new(io::Error::other("disk on fire")))
    }
}

fn runtime() -> (Runtime, Arc<Mutex<Vec<Vec<String>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut runtime = Runtime::new();
    let recorded = Arc::clone(&seen);
    runtime.registry.register(
        "rec",
        factory(move |_| {
            Box::new(Recorder {
                seen: Arc::clone(&recorded),
            })
        }),
    );
    runtime.registry.register("echo", factory(|_| Box::new(Plain)));
    runtime.registry.register("upper", factory(|_| Box::new(Upper)));
    runtime.registry.register("fail", factory(|_| Box::new(Fail)));
    (runtime, seen)
}

fn run_with(runtime: &mut Runtime, source: &str) -> Result<String, ScanError> {
    let mut storage = Storage::new();
    let mut doc = Document::standalone("test.op");
    expand(source, "test.op", runtime, &mut storage, &mut doc)
}

fn run(source: &str) -> Result<String, ScanError> {
    run_with(&mut runtime().0, source)
}

fn fail(source: &str) -> ScanError {
    run(source).expect_err("expansion should fail")
}

#[test]
fn text_without_directives_passes_through() {
    let source = "plain text\nwith é and \r\n mixed\rterminators\n\r";
    assert_eq!(run(source).unwrap(), source);
}

#[test]
fn positions_count_lines_and_characters() {
    let err = fail("ab\ncd\r\né@nope|x|");
    assert!(matches!(err.kind, ScanErrorKind::UnknownCommand(ref name) if name == "nope"));
    assert_eq!((err.line, err.column), (3, 2));
    assert_eq!(err.to_string(), "test.op:3:2: command nope is not found");
}

#[test]
fn stray_at_signs_are_literal() {
    let source = "mail me@example.com, @ alone, @|x| and @";
    assert_eq!(run(source).unwrap(), source);
}

#[test]
fn escaped_begin_is_literal() {
    assert_eq!(run("\\@begin rec\nbody\n").unwrap(), "@begin rec\nbody\n");
}

#[test]
fn repeated_escapes() {
    assert_eq!(run("\\@\\@x").unwrap(), "@@x");
}

#[test]
fn bracket_escapes_are_removed() {
    assert_eq!(run("@(a\\(b\\)c)").unwrap(), "a(b)c");
    assert_eq!(run("x @[y\\]] z").unwrap(), "x y] z");
}

#[test]
fn block_returns_command_output() {
    let (mut runtime, seen) = runtime();
    let out = run_with(&mut runtime, "@begin rec x\nHELLO\n@end rec").unwrap();
    assert_eq!(out, "HELLO\n");
    assert_eq!(*seen.lock().unwrap(), vec![vec!["x".to_string()]]);
}

#[test]
fn builtin_plain_block() {
    assert_eq!(run("@begin plain x\nHELLO\n@end plain").unwrap(), "HELLO\n");
}

#[test]
fn block_arguments_are_shell_split() {
    let (mut runtime, seen) = runtime();
    run_with(&mut runtime, "@begin rec a 'b c' \"d\\\"e\"\n@end rec\n").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![vec!["a".to_string(), "b c".to_string(), "d\"e".to_string()]]);
}

#[test]
fn text_around_block_is_kept() {
    assert_eq!(run("before\n@begin rec\nin\n@end rec\nafter").unwrap(), "before\nin\nafter");
}

#[test]
fn mismatched_end_is_content() {
    assert_eq!(run("@begin rec\n@end other\n@end rec\n").unwrap(), "@end other\n");
}

#[test]
fn escaped_end_is_content() {
    assert_eq!(run("@begin rec\n\\@end rec\n@end rec\n").unwrap(), "\\@end rec\n");
}

#[test]
fn pipe_run_sets_delimiter_width() {
    assert_eq!(run("@echo||hi|world||").unwrap(), "hi|world");
    assert_eq!(run("@echo|hi|").unwrap(), "hi");
    assert_eq!(run("<@echo|a| @echo|||b||c|||>").unwrap(), "<a b||c>");
}

#[test]
fn unterminated_block_names_command_and_line() {
    let err = fail("text\n@begin rec\nbody\n");
    assert!(matches!(err.kind, ScanErrorKind::UnterminatedBlock { ref name } if name == "rec"));
    assert_eq!((err.line, err.column), (2, 1));
    assert!(err.to_string().contains("@begin rec"));
}

#[test]
fn end_without_name() {
    let err = fail("@begin rec\nx\n@end\n");
    assert!(matches!(err.kind, ScanErrorKind::EmptyEndName { ref open } if open == "rec"));
    assert_eq!(err.line, 3);
}

#[test]
fn begin_without_name() {
    assert!(matches!(fail("@begin\nx\n").kind, ScanErrorKind::EmptyBeginArgs));
}

#[test]
fn begin_with_unclosed_quote() {
    assert!(matches!(fail("@begin rec 'oops\n@end rec\n").kind, ScanErrorKind::InvalidArguments(_)));
}

#[test]
fn unknown_block_command() {
    let err = fail("@begin nope\n@end nope\n");
    assert!(matches!(err.kind, ScanErrorKind::UnknownCommand(ref name) if name == "nope"));
    assert_eq!(err.excerpt, "@begin nope");
}

#[test]
fn unterminated_inline() {
    let err = fail("@echo||a|b");
    assert!(matches!(
        err.kind,
        ScanErrorKind::UnterminatedInline { ref name, width: 2 } if name == "echo"
    ));
}

#[test]
fn bracket_span_cannot_cross_lines() {
    let err = fail("ok\n@(a\nb)");
    assert!(matches!(err.kind, ScanErrorKind::UnexpectedNewline { open: '(', close: ')' }));
    assert_eq!((err.line, err.column), (2, 1));
}

#[test]
fn block_failure_keeps_cause() {
    let err = fail("@begin fail a b\n@end fail\n");
    match &err.kind {
        ScanErrorKind::CommandFailed { name, args, .. } => {
            assert_eq!(name, "fail");
            assert_eq!(args, &["a", "b"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind.to_string(), "fail failed to process (args: [\"a\", \"b\"])");
    let cause = std::error::Error::source(&err).expect("cause");
    assert_eq!(cause.to_string(), "disk on fire");
    assert_eq!(err.causes(), vec!["disk on fire"]);
}

#[test]
fn inline_failure_keeps_cause() {
    let err = fail("x @fail|y|");
    assert!(matches!(err.kind, ScanErrorKind::CommandFailed { ref args, .. } if args.is_empty()));
    assert_eq!(err.column, 3);
    assert_eq!(err.causes(), vec!["disk on fire"]);
}

#[test]
fn nested_scan_expands_content() {
    assert_eq!(run("@begin upper\nsay @echo|hi|\n@end upper\n").unwrap(), "SAY HI\n");
}

#[test]
fn nested_blocks_close_innermost_first() {
    let source = "@begin upper\n@begin plain\nraw @echo|x|\n@end plain\n@end upper\n";
    assert_eq!(run(source).unwrap(), "RAW @ECHO|X|\n");
}

#[test]
fn nested_error_is_wrapped_with_its_position() {
    let err = fail("line\n@begin upper\nfirst\n  @nope|x|\n@end upper\n");
    assert!(matches!(err.kind, ScanErrorKind::CommandFailed { ref name, .. } if name == "upper"));
    let inner = std::error::Error::source(&err)
        .and_then(|cause| cause.downcast_ref::<ScanError>())
        .expect("nested scan error");
    assert!(matches!(inner.kind, ScanErrorKind::UnknownCommand(_)));
    assert_eq!((inner.line, inner.column), (4, 3));
}

#[test]
fn inline_advances_position_over_content() {
    let err = fail("@echo|a\nbc|@nope|x|");
    assert_eq!((err.line, err.column), (2, 4));
}

#[test]
fn operators_are_replaceable() {
    let (mut runtime, _) = runtime();
    runtime
        .operators
        .set(Bracket::Square, |ctx, span| Ok(format!("<{}>", ctx.text(span))));
    runtime.operators.set(Bracket::Curly, |ctx, span| {
        let key = ctx.text(span);
        ctx.storage()
            .get_str(key)
            .map(str::to_string)
            .ok_or_else(|| format!("{key} is not set").into())
    });

    let mut storage = Storage::new();
    storage.set("name", "world");
    let mut doc = Document::standalone("test.op");
    let out = expand("@[a] hello @{name}", "test.op", &mut runtime, &mut storage, &mut doc).unwrap();
    assert_eq!(out, "<a> hello world");

    let err = expand("@{missing}", "test.op", &mut runtime, &mut storage, &mut doc).unwrap_err();
    assert!(matches!(err.kind, ScanErrorKind::OperatorFailed { open: '{', .. }));
    assert_eq!(err.causes(), vec!["missing is not set"]);
}

#[test]
fn operators_see_the_directive_position() {
    let (mut runtime, _) = runtime();
    runtime.operators.set(Bracket::Round, |ctx, span| {
        Ok(format!("{}:{}@{}={}", ctx.line(), ctx.column(), ctx.offset(), ctx.text(span)))
    });
    assert_eq!(run_with(&mut runtime, "ab\ncé @(x) @(y)").unwrap(), "ab\ncé 1:3@7=x 1:8@12=y");
}

/// Expands only the content after its first line.
struct Tail;

impl Command for Tail {
    fn full_block(
        &mut self,
        inv: &mut Invocation<'_, '_>,
        _args: &[String],
        content: Range<usize>,
    ) -> Result<String, BoxError> {
        let first_line = inv.text(content.clone()).find('\n').map_or(0, |i| i + 1);
        Ok(inv.process_nest(content.start + first_line..content.end)?)
    }
}

#[test]
fn nested_scan_starts_at_the_frame_position() {
    let (mut runtime, _) = runtime();
    runtime.registry.register("tail", factory(|_| Box::new(Tail)));

    let out = run_with(&mut runtime, "@begin tail\nfirst\nsecond\n@end tail\n").unwrap();
    assert_eq!(out, "second\n");

    // `@nope` sits on line 3, but the nested scan counts from the line
    // after `@begin`.
    let err = run_with(&mut runtime, "@begin tail\nfirst\n@nope|x|\n@end tail\n").unwrap_err();
    let inner = std::error::Error::source(&err)
        .and_then(|cause| cause.downcast_ref::<ScanError>())
        .expect("nested scan error");
    assert!(matches!(inner.kind, ScanErrorKind::UnknownCommand(_)));
    assert_eq!((inner.line, inner.column), (2, 1));
}

#[test]
fn diagnostic_carries_causes_as_notes() {
    let err = fail("@begin fail\n@end fail\n");
    let diagnostic = err.to_diagnostic(0);
    assert_eq!(diagnostic.message, "fail failed to process (args: [])");
    assert_eq!(diagnostic.notes, vec!["caused by: disk on fire"]);
}
