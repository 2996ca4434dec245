/// Declaration end resolution.
///
/// This is the single algorithm used wherever a declaration's extent is
/// needed (indexer spans, block boundaries, moving a declaration).  It
/// walks the code mask after the parameter list, counting block keywords:
///
///   - `BEGIN` and `CASE` open a block, `END` closes one.
///   - `END IF` and `END LOOP` close constructs that are not counted.
///   - `END CASE` closes the counted `CASE`.
///
/// Once a `BEGIN` has been seen, the first `END` that brings the depth back
/// to zero terminates the declaration (together with an optional block
/// label and the `;`).  A body without any `BEGIN` ends at the first `;`
/// outside a dollar-quoted string.  The `;`s of a `DECLARE` section belong
/// to the block that follows it and never end the declaration.
use std::sync::LazyLock;

use regex::Regex;

use crate::scanner::CodeMask;

static END_STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bend\s*;").unwrap());

/// Resolve the exclusive end offset of a declaration whose parameter list
/// closes just before `from`.  The search never looks at or past `limit`
/// (the next declaration anchor, or the end of the text).
///
/// Fallbacks, in order, when the keyword walk does not settle it: the first
/// `END;`, the first `;`, and finally `limit` itself.
pub fn resolve_declaration_end(mask: &CodeMask, from: usize, limit: usize) -> usize {
    let limit = limit.min(mask.len());
    if from >= limit {
        return limit;
    }
    let code = &mask.as_str()[..limit];

    if let Some(end) = walk_blocks(code, from) {
        return end;
    }
    if let Some(m) = END_STATEMENT_RE.find_at(code, from) {
        return m.end();
    }
    if let Some(semi) = code[from..].find(';') {
        return from + semi + 1;
    }
    limit
}

fn walk_blocks(code: &str, from: usize) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut depth: i32 = 0;
    let mut saw_begin = false;
    let mut in_declare = false;
    let mut dollar_tag: Option<&str> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];

        if b == b'$'
            && let Some(len) = dollar_tag_len(bytes, i)
        {
            let tag = &code[i..i + len];
            match dollar_tag {
                Some(open) if open == tag => dollar_tag = None,
                None => dollar_tag = Some(tag),
                Some(_) => {}
            }
            i += len;
            continue;
        }

        if b == b';' && dollar_tag.is_none() && !saw_begin && !in_declare {
            return Some(i + 1);
        }

        if !is_word_byte(b) {
            i += 1;
            continue;
        }

        let word_end = word_end(bytes, i);
        let word = &code[i..word_end];
        i = word_end;

        if word.eq_ignore_ascii_case("declare") {
            in_declare = true;
        } else if word.eq_ignore_ascii_case("begin") {
            depth += 1;
            saw_begin = true;
            in_declare = false;
        } else if word.eq_ignore_ascii_case("case") {
            depth += 1;
        } else if word.eq_ignore_ascii_case("end") {
            if let Some((next_start, next_end)) = next_word(code, word_end) {
                let next = &code[next_start..next_end];
                if next.eq_ignore_ascii_case("if") || next.eq_ignore_ascii_case("loop") {
                    i = next_end;
                    continue;
                }
                if next.eq_ignore_ascii_case("case") {
                    depth -= 1;
                    i = next_end;
                    continue;
                }
            }
            depth -= 1;
            if saw_begin && depth <= 0 {
                return Some(terminator_after(code, word_end));
            }
        }
    }

    None
}

/// Length of the dollar-quote tag (`$$` or `$name$`) starting at `i`.
fn dollar_tag_len(bytes: &[u8], i: usize) -> Option<usize> {
    let mut j = i + 1;
    match bytes.get(j) {
        Some(b'$') => return Some(2),
        Some(c) if c.is_ascii_alphabetic() || *c == b'_' => {}
        _ => return None,
    }
    while j < bytes.len() && is_word_byte(bytes[j]) {
        j += 1;
    }
    (bytes.get(j) == Some(&b'$')).then(|| j + 1 - i)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn word_end(bytes: &[u8], start: usize) -> usize {
    let mut j = start;
    while j < bytes.len() && is_word_byte(bytes[j]) {
        j += 1;
    }
    j
}

/// The word after `from` when only whitespace separates them.
fn next_word(code: &str, from: usize) -> Option<(usize, usize)> {
    let rest = &code[from..];
    let start = from + (rest.len() - rest.trim_start().len());
    let bytes = code.as_bytes();
    if start < bytes.len() && is_word_byte(bytes[start]) {
        Some((start, word_end(bytes, start)))
    } else {
        None
    }
}

/// Offset just past the `;` that finishes a closing `END` (allowing a block
/// label in between), or the end of the `END` keyword when there is none.
fn terminator_after(code: &str, end_keyword_end: usize) -> usize {
    let semicolon_after = |pos: usize| {
        let rest = &code[pos..];
        let skipped = rest.len() - rest.trim_start().len();
        (rest[skipped..].starts_with(';')).then(|| pos + skipped + 1)
    };

    if let Some(end) = semicolon_after(end_keyword_end) {
        return end;
    }
    if let Some((_, label_end)) = next_word(code, end_keyword_end)
        && let Some(end) = semicolon_after(label_end)
    {
        return end;
    }
    end_keyword_end
}
