/// Utility functions for the pgsql-lsp server.
///
/// This module contains the line index used for offset/position
/// conversion, word extraction at the cursor, whole-word matching, and
/// client logging.
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::*;

use crate::Backend;

/// What counts as "the word under the cursor": a double-quoted identifier
/// or a run of identifier characters (dots and colons included so that
/// `schema.func` is one word).
static WORD_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]+"|[a-zA-Z0-9_:.]+"#).unwrap());

/// Byte offsets of line starts, for converting between byte offsets and
/// LSP positions.  Columns in LSP positions are UTF-16 code units.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(memchr::memchr_iter(b'\n', text.as_bytes()).map(|i| i + 1));
        Self {
            line_starts,
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        line as u32
    }

    /// Byte range of `line` excluding its line terminator.
    pub fn line_range(&self, text: &str, line: u32) -> Option<Range<usize>> {
        let start = *self.line_starts.get(line as usize)?;
        let mut end = self
            .line_starts
            .get(line as usize + 1)
            .map_or(self.len, |next| next - 1);
        if end > start && text.as_bytes().get(end - 1) == Some(&b'\r') {
            end -= 1;
        }
        Some(start..end)
    }

    /// Text of `line` without its line terminator.
    pub fn line_text<'a>(&self, text: &'a str, line: u32) -> &'a str {
        self.line_range(text, line).map_or("", |range| &text[range])
    }

    pub fn position_of(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = self.line_of(offset);
        let start = self.line_starts[line as usize];
        let character = text
            .get(start..offset)
            .map_or(0, |prefix| prefix.encode_utf16().count());
        Position {
            line,
            character: character as u32,
        }
    }

    pub fn range_of(&self, text: &str, range: Range<usize>) -> tower_lsp::lsp_types::Range {
        tower_lsp::lsp_types::Range {
            start: self.position_of(text, range.start),
            end: self.position_of(text, range.end),
        }
    }

    /// Byte offset of an LSP position.  Columns past the end of the line
    /// clamp to the line end; lines past the end of the text yield `None`.
    pub fn offset_of(&self, text: &str, position: Position) -> Option<usize> {
        let range = self.line_range(text, position.line)?;
        let line = &text[range.clone()];
        let mut units = 0u32;
        for (idx, ch) in line.char_indices() {
            if units >= position.character {
                return Some(range.start + idx);
            }
            units += ch.len_utf16() as u32;
        }
        Some(range.end)
    }
}

/// The word under the cursor and its byte range in `text`.
///
/// A cursor sitting right after the last character of a word still selects
/// that word.
pub fn word_at_position(text: &str, index: &LineIndex, position: Position) -> Option<(Range<usize>, String)> {
    let line_range = index.line_range(text, position.line)?;
    let line = &text[line_range.clone()];
    let col = index.offset_of(text, position)? - line_range.start;

    WORD_RANGE_RE
        .find_iter(line)
        .find(|m| m.start() <= col && col <= m.end())
        .map(|m| {
            (
                line_range.start + m.start()..line_range.start + m.end(),
                m.as_str().to_string(),
            )
        })
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Every case-insensitive, whole-word occurrence of `name` in `haystack`.
///
/// "Whole word" only constrains the edges of `name` that are identifier
/// characters, so a quoted name like `"My Proc"` may touch anything.
pub fn find_whole_word(haystack: &str, name: &str) -> Vec<Range<usize>> {
    let Some(first) = name.chars().next() else {
        return Vec::new();
    };
    let Some(last) = name.chars().next_back() else {
        return Vec::new();
    };
    let Ok(re) = Regex::new(&format!("(?i){}", regex::escape(name))) else {
        return Vec::new();
    };
    let check_before = is_ident_char(first);
    let check_after = is_ident_char(last);

    let mut found = Vec::new();
    let mut at = 0;
    while let Some(m) = re.find_at(haystack, at) {
        let before_ok = !check_before
            || !haystack[..m.start()]
                .chars()
                .next_back()
                .is_some_and(is_ident_char);
        let after_ok = !check_after || !haystack[m.end()..].chars().next().is_some_and(is_ident_char);

        if before_ok && after_ok {
            found.push(m.range());
            at = m.end();
        } else {
            // Retry one character later; a longer identifier may hide a
            // valid occurrence that overlaps this one.
            at = m.start() + haystack[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
        if at >= haystack.len() {
            break;
        }
    }
    found
}

impl Backend {
    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}
