/// SQL declaration parsing.
///
/// This module locates `CREATE [OR REPLACE] FUNCTION|PROCEDURE` statements
/// in arbitrary SQL text and turns each one into a [`Declaration`] record.
/// There is no SQL grammar here: the [`crate::scanner`] state machine
/// tells code apart from strings and comments, and everything else is
/// anchor matching plus paren balancing.
///
/// Sub-modules:
/// - [`params`]: Splitting a raw parameter list into parameters
/// - [`end`]: Resolving where a declaration ends (BEGIN/END nesting)
/// - [`comments`]: `COMMENT ON FUNCTION ... IS '...'` descriptions
mod comments;
mod end;
mod params;

use std::sync::LazyLock;

use regex::Regex;

use crate::scanner::{CodeMask, extract_balanced_parens};
use crate::types::{Declaration, DeclarationKind};

pub use comments::{comment_on_statements, extract_comment_description};
pub use end::resolve_declaration_end;
pub use params::split_parameters;

/// Statement anchor: `create [or replace] function|procedure`.
pub(crate) static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcreate\s+(?:or\s+replace\s+)?(function|procedure)\b").unwrap()
});

/// Parse every declaration in `text`, in source order.
///
/// Anchors inside comments or strings are ignored.  An anchor that is not
/// followed by a name and a balanced parameter list is discarded and
/// scanning resumes right after it.  After a declaration is accepted,
/// scanning resumes at its resolved end, so spans never overlap.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    let mask = CodeMask::new(text);
    parse_declarations_masked(text, &mask)
}

/// [`parse_declarations`] for callers that already hold the code mask.
pub(crate) fn parse_declarations_masked(text: &str, mask: &CodeMask) -> Vec<Declaration> {
    let masked = mask.as_str();
    let mut results = Vec::new();
    let mut cursor = 0;

    while cursor < masked.len() {
        let Some(caps) = ANCHOR_RE.captures_at(masked, cursor) else {
            break;
        };
        let (Some(anchor), Some(keyword)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let Some(kind) = DeclarationKind::from_keyword(keyword.as_str()) else {
            cursor = anchor.end();
            continue;
        };

        // Declarations never reach past the next anchor.
        let region_end = ANCHOR_RE
            .find_at(masked, anchor.end())
            .map_or(masked.len(), |m| m.start());

        let Some((raw_name, name_start, name_end)) = read_name(text, anchor.end(), region_end)
        else {
            cursor = anchor.end();
            continue;
        };

        let name = normalize_identifier(raw_name);
        if name.is_empty() {
            cursor = anchor.end();
            continue;
        }

        let Some(params_open) = masked[name_end..region_end]
            .find('(')
            .map(|rel| name_end + rel)
        else {
            cursor = anchor.end();
            continue;
        };

        let Some(balanced) = extract_balanced_parens(text, params_open) else {
            cursor = anchor.end();
            continue;
        };

        // A balanced list that runs into the next declaration belongs to a
        // malformed statement.
        if balanced.end_index >= region_end {
            cursor = anchor.end();
            continue;
        }

        let end = resolve_declaration_end(mask, balanced.end_index + 1, region_end);

        results.push(Declaration {
            name,
            raw_name: raw_name.to_string(),
            kind,
            parameters: balanced.content.to_string(),
            start: anchor.start(),
            end,
            name_start,
            params_open,
            params_close: balanced.end_index,
        });

        cursor = end.max(anchor.end());
    }

    results
}

/// Read the declaration name following an anchor.
///
/// Returns the raw name and its byte range, or `None` when no name is
/// present before `limit`.
fn read_name(text: &str, from: usize, limit: usize) -> Option<(&str, usize, usize)> {
    let rest = &text[from..limit];
    let skipped = rest.len() - rest.trim_start().len();
    let start = from + skipped;
    let bytes = text.as_bytes();

    if start >= limit {
        return None;
    }

    let end = if bytes[start] == b'"' {
        let mut j = start + 1;
        loop {
            match bytes.get(j) {
                // `""` inside a quoted identifier is an escaped quote.
                Some(b'"') if bytes.get(j + 1) == Some(&b'"') => j += 2,
                Some(b'"') => break j + 1,
                Some(_) if j < limit => j += 1,
                _ => break j.min(limit),
            }
        }
    } else {
        let mut j = start;
        while j < limit && is_name_byte(bytes[j]) {
            j += 1;
        }
        j
    };

    if end == start {
        return None;
    }
    Some((&text[start..end], start, end))
}

/// Characters allowed in an unquoted declaration name.  The dot allows
/// schema-qualified names like `billing.calc`.
pub(crate) fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.' | b'$')
}

/// Strip the surrounding quotes of a quoted identifier and collapse `""`
/// to `"`.  Unquoted identifiers are returned unchanged (trimmed).
pub fn normalize_identifier(id: &str) -> String {
    let id = id.trim();
    if id.len() >= 2 && id.starts_with('"') && id.ends_with('"') {
        id[1..id.len() - 1].replace("\"\"", "\"")
    } else {
        id.to_string()
    }
}

/// Find the first declaration named `name` (case-insensitive, after
/// normalising `name`).
pub fn find_declaration<'a>(declarations: &'a [Declaration], name: &str) -> Option<&'a Declaration> {
    let normalized = normalize_identifier(name);
    declarations.iter().find(|d| d.is_named(&normalized))
}
