use std::collections::BTreeMap;

use ptag::{
    CompileErrorKind, Value, build_expression, build_expressions, compile_conjunction, compile_pattern,
    compile_patterns,
};
use rstest::rstest;

fn pattern_error(source: &str) -> CompileErrorKind {
    compile_pattern(source).expect_err("should not compile").kind
}

fn expression_error(source: &str) -> CompileErrorKind {
    build_expression(source).expect_err("should not build").kind
}

#[test]
fn names_build_as_strings() {
    assert_eq!(build_expression("draft").unwrap(), Value::from("draft"));
    assert_eq!(build_expression("'two words'").unwrap(), Value::from("two words"));
}

#[test]
fn negative_numbers_fold() {
    assert_eq!(build_expression("-3").unwrap(), Value::Number(-3.0));
    assert_eq!(build_expression("[1, -2.5]").unwrap(), Value::List(vec![Value::Number(1.0), Value::Number(-2.5)]));
}

#[test]
fn calls_build_call_values() {
    let value = build_expression("series(rust, 2)").unwrap();
    assert_eq!(
        value,
        Value::call("series", vec![Value::from("rust"), Value::Number(2.0)])
    );
}

#[test]
fn records_normalize_numeric_keys() {
    let value = build_expression("{1: one, 2.0: two, 'x y': 3}").unwrap();
    let mut expected = BTreeMap::new();
    expected.insert("1".to_string(), Value::from("one"));
    expected.insert("2".to_string(), Value::from("two"));
    expected.insert("x y".to_string(), Value::Number(3.0));
    assert_eq!(value, Value::Record(expected));
}

#[test]
fn build_expressions_calls_back_per_entry() {
    let mut tags = Vec::new();
    let count = build_expressions("draft\nlang(rust); year(2024)\n\n", |v| tags.push(v)).unwrap();
    assert_eq!(count, 3);
    assert_eq!(tags[0], Value::from("draft"));
    assert_eq!(tags[2], Value::call("year", vec![Value::Number(2024.0)]));
}

#[test]
fn build_expressions_is_all_or_nothing() {
    let mut tags = Vec::new();
    let result = build_expressions("draft\n~oops", |v| tags.push(v));
    assert!(result.is_err());
    assert!(tags.is_empty());
}

#[test]
fn comments_and_indentation_are_ignored() {
    let source = "
        # the first tag
        draft
        lang(
            rust,
        )
    ";
    let patterns = compile_patterns(source).unwrap();
    assert_eq!(patterns.len(), 2);
}

#[test]
fn empty_block_is_an_empty_pattern_list() {
    assert_eq!(compile_patterns("  \n# nothing\n").unwrap().len(), 0);
    assert_eq!(
        compile_conjunction("\n").unwrap_err().kind,
        CompileErrorKind::EmptyPatternList
    );
}

#[rstest]
#[case::two_stars("[*a, *b]", CompileErrorKind::MultipleStarred)]
#[case::keyword("f(x=1)", CompileErrorKind::KeywordArgument)]
#[case::computed_key("{f(x): 1}", CompileErrorKind::NonConstantKey)]
#[case::duplicate_key("{a: 1, 'a': 2}", CompileErrorKind::DuplicateKey("a".into()))]
#[case::record_splat("{**rest}", CompileErrorKind::RecordSplat)]
#[case::star_outside_list("f(*xs)", CompileErrorKind::MisplacedStarred)]
#[case::keyword_in_guard("P[len(x=_)]", CompileErrorKind::KeywordArgument)]
fn pattern_compile_errors(#[case] source: &str, #[case] expected: CompileErrorKind) {
    assert_eq!(pattern_error(source), expected);
}

#[rstest]
#[case::comparison("a == b")]
#[case::subscript("tags[0]")]
#[case::capture_in_guard("P[~x]")]
#[case::call_in_guard("P[print(_)]")]
#[case::record_in_guard("P[{a: 1}]")]
fn pattern_unsupported(#[case] source: &str) {
    assert!(matches!(pattern_error(source), CompileErrorKind::Unsupported(_)));
}

#[rstest]
#[case::capture("~x")]
#[case::splat("[*xs]")]
#[case::logic("a and b")]
#[case::wildcard("f(_)")]
fn expression_unsupported(#[case] source: &str) {
    assert!(matches!(expression_error(source), CompileErrorKind::Unsupported(_)));
}

#[rstest]
#[case::unclosed_list("[1, 2")]
#[case::dangling_operator("a and")]
#[case::bad_capture("~1")]
#[case::unterminated_string("'abc")]
#[case::chained("P[1 < _ < 3]")]
#[case::overflowing_number("1e999")]
#[case::unknown_escape("'a\\db'")]
fn syntax_errors(#[case] source: &str) {
    let err = compile_pattern(source).expect_err("should fail");
    assert!(
        matches!(err.kind, CompileErrorKind::Syntax(_) | CompileErrorKind::Unsupported(_)),
        "unexpected error {:?}",
        err.kind
    );
}

#[test]
fn single_expression_required() {
    assert_eq!(expression_error("a\nb"), CompileErrorKind::ExpectedSingle(2));
}

#[test]
fn error_spans_point_into_source() {
    let source = "[1, *a, *b]";
    let err = compile_pattern(source).unwrap_err();
    assert_eq!(&source[err.span.clone()], "*b");
}

#[rstest]
#[case("draft")]
#[case("'needs quoting'")]
#[case("lang(rust, 2)")]
#[case("[1, 2.5, -3, True]")]
#[case("{kind: post, 'no bare': [a, b]}")]
#[case("'it\\'s'")]
fn display_builds_back(#[case] source: &str) {
    let value = build_expression(source).unwrap();
    let rebuilt = build_expression(&value.to_string()).unwrap();
    assert_eq!(rebuilt, value);
}

#[test]
fn display_quotes_keywords() {
    assert_eq!(Value::from("and").to_string(), "'and'");
    assert_eq!(Value::from("plain").to_string(), "plain");
    assert_eq!(
        Value::call("f", vec![Value::Number(1.0), Value::from("x y")]).to_string(),
        "f(1, 'x y')"
    );
}

#[test]
fn string_escapes() {
    assert_eq!(
        build_expression(r#"'a\'b\\c\n"d"'"#).unwrap(),
        Value::from("a'b\\c\n\"d\"")
    );
    let err = build_expression(r"'\0'").unwrap_err();
    assert_eq!(err.span, 1..3);
}

#[test]
fn large_numbers_round_trip() {
    let value = build_expression("1e300").unwrap();
    assert_eq!(build_expression(&value.to_string()).unwrap(), value);
    assert!(build_expression("-1e999").is_err());
}
