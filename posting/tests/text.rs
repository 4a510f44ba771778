use posting::text::{advance_position, find_line_end, find_match, terminator_len};

#[test]
fn terminators_prefer_two_characters() {
    assert_eq!(terminator_len("\r\nx", 0, 3), 2);
    assert_eq!(terminator_len("\n\rx", 0, 3), 2);
    assert_eq!(terminator_len("\n\nx", 0, 3), 1);
    assert_eq!(terminator_len("x", 0, 1), 0);
}

#[test]
fn line_end_at_end_of_input() {
    assert_eq!(find_line_end("abc", 0, 3), (3, 3));
    assert_eq!(find_line_end("ab\r\ncd", 0, 6), (2, 4));
}

#[test]
fn position_counts_characters() {
    assert_eq!(advance_position("héllo", 0, 0), (0, 5));
    assert_eq!(advance_position("a\r\nbc\nd", 2, 7), (4, 1));
}

#[test]
fn match_skips_escapes() {
    let text = "(a\\(b\\)c) tail";
    let (inner, after) = find_match("(", ")", &["\\(", "\\)"], text, 0, text.len()).unwrap();
    assert_eq!(&text[inner], "a\\(b\\)c");
    assert_eq!(&text[after..], " tail");
}

#[test]
fn match_respects_limit() {
    assert_eq!(find_match("(", ")", &[], "(abc)", 0, 4), None);
    assert_eq!(find_match("[", "]", &[], "(abc)", 0, 5), None);
}
