use std::collections::HashMap;

use crate::compile::Pattern;
use crate::value::Value;

/// Captures bound by a match, by name.
pub type CaptureScope = HashMap<String, Value>;

/// Match one subject, writing captures into `scope`.
pub fn match_one(pattern: &Pattern, subject: &Value, scope: &mut CaptureScope) -> bool {
    pattern.matches(subject, scope)
}

/// Try `subjects` in order and stop at the first match.
///
/// The same scope is threaded through every attempt. Captures bound while
/// testing a subject that ultimately failed stay in `scope`; only
/// evaluation under `not` is isolated.
pub fn match_any<'v>(
    pattern: &Pattern,
    subjects: impl IntoIterator<Item = &'v Value>,
    scope: &mut CaptureScope,
) -> bool {
    subjects
        .into_iter()
        .any(|subject| pattern.matches(subject, scope))
}

/// Match against a fresh scope. Returns the captures if the match succeeds.
pub fn match_tag(pattern: &Pattern, subject: &Value) -> Option<CaptureScope> {
    let mut scope = CaptureScope::new();
    if pattern.matches(subject, &mut scope) {
        Some(scope)
    } else {
        None
    }
}
