/// `COMMENT ON FUNCTION|PROCEDURE` support.
///
/// PostgreSQL attaches documentation to routines with a separate
/// statement:
///
/// ```sql
/// COMMENT ON FUNCTION calc(int) IS 'Computes the thing';
/// ```
///
/// Hover and completion show that text as the routine's description, and
/// moving a routine to another file carries these statements along.
use std::ops::Range;

use regex::Regex;

use crate::scanner::CodeMask;

fn comment_on_pattern(raw_name: &str, with_terminator: bool) -> Option<Regex> {
    let pattern = if with_terminator {
        format!(
            r#"(?i)comment\s+on\s+(?:function|procedure)\s+{}\s*(?:\([^)]*?\))?\s+is\s+['"][^'"]*['"]\s*;?"#,
            regex::escape(raw_name)
        )
    } else {
        format!(
            r#"(?i)comment\s+on\s+(?:function|procedure)\s+{}\s*(?:\([^)]*?\))?\s+is\s+['"]([^'"]+)['"]"#,
            regex::escape(raw_name)
        )
    };
    Regex::new(&pattern).ok()
}

/// The description from the first `COMMENT ON` statement for `raw_name`
/// in `text`, if any.  Statements that sit inside comments or strings are
/// ignored.
pub fn extract_comment_description(text: &str, raw_name: &str) -> Option<String> {
    if text.is_empty() || raw_name.is_empty() {
        return None;
    }
    let re = comment_on_pattern(raw_name, false)?;
    let mask = CodeMask::new(text);

    re.captures_iter(text)
        .filter(|caps| caps.get(0).is_some_and(|m| mask.is_code(m.start())))
        .find_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
}

/// Byte ranges of every `COMMENT ON` statement for `raw_name`, including
/// the trailing `;` when present.
pub fn comment_on_statements(text: &str, raw_name: &str) -> Vec<Range<usize>> {
    let Some(re) = comment_on_pattern(raw_name, true) else {
        return Vec::new();
    };
    let mask = CodeMask::new(text);

    re.find_iter(text)
        .filter(|m| mask.is_code(m.start()))
        .map(|m| m.range())
        .collect()
}
