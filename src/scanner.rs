//! Lexical scanning for SQL text.
//!
//! Everything that needs to know whether a byte is "real" SQL or sits
//! inside a string literal, a quoted identifier, or a comment goes through
//! the [`Scanner`] state machine defined here:
//!
//! - [`extract_balanced_parens`]: match an opening `(` with its closing `)`
//!   while ignoring parens inside strings and comments.
//! - [`CodeMask`]: a copy of the document where every non-code byte is
//!   blanked out, so regexes and keyword walks only ever see code.
//!
//! All delimiters are ASCII, so the scanner walks bytes.  Multi-byte UTF-8
//! sequences never contain ASCII bytes, which keeps every offset produced
//! here on a character boundary.

/// The lexical mode a byte belongs to.
///
/// Opening and closing delimiters belong to the construct they delimit
/// (the quote characters of `'abc'` are reported as `SingleQuote`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    Code,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Byte-level iterator yielding `(offset, byte, mode)` for every byte of
/// the input.
///
/// Mode transitions:
///   - `--` opens a line comment, closed by `\n`.
///   - `/*` opens a block comment, closed by the first `*/` after it.
///   - `'` toggles single-quote mode (not inside a quoted identifier).
///   - `"` toggles double-quote mode (not inside a string).
///
/// There is no backslash escaping.  A doubled `''` simply closes and
/// reopens the string, which leaves every byte classified correctly.
pub struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    mode: LexMode,
    /// Offset of the `/` that opened the current block comment.
    comment_start: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::starting_at(text, 0)
    }

    /// Start scanning at `offset` in [`LexMode::Code`].
    pub fn starting_at(text: &'a str, offset: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: offset,
            mode: LexMode::Code,
            comment_start: 0,
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = (usize, u8, LexMode);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        let b = *self.bytes.get(i)?;
        self.pos += 1;
        let next = self.bytes.get(i + 1).copied();

        let mode = match self.mode {
            LexMode::Code => match b {
                b'-' if next == Some(b'-') => {
                    self.mode = LexMode::LineComment;
                    LexMode::LineComment
                }
                b'/' if next == Some(b'*') => {
                    self.mode = LexMode::BlockComment;
                    self.comment_start = i;
                    LexMode::BlockComment
                }
                b'\'' => {
                    self.mode = LexMode::SingleQuote;
                    LexMode::SingleQuote
                }
                b'"' => {
                    self.mode = LexMode::DoubleQuote;
                    LexMode::DoubleQuote
                }
                _ => LexMode::Code,
            },
            LexMode::LineComment => {
                if b == b'\n' {
                    self.mode = LexMode::Code;
                }
                LexMode::LineComment
            }
            LexMode::BlockComment => {
                // The `*` of the opening `/*` cannot double as the `*` of
                // the closing `*/`, so `/*/` stays open.
                if b == b'/' && i >= self.comment_start + 3 && self.bytes[i - 1] == b'*' {
                    self.mode = LexMode::Code;
                }
                LexMode::BlockComment
            }
            LexMode::SingleQuote => {
                if b == b'\'' {
                    self.mode = LexMode::Code;
                }
                LexMode::SingleQuote
            }
            LexMode::DoubleQuote => {
                if b == b'"' {
                    self.mode = LexMode::Code;
                }
                LexMode::DoubleQuote
            }
        };

        Some((i, b, mode))
    }
}

/// Result of a successful [`extract_balanced_parens`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancedParens<'a> {
    /// Text strictly between the opening and the closing paren.
    pub content: &'a str,
    /// Absolute offset of the closing `)`.
    pub end_index: usize,
}

/// Find the `)` that closes the `(` at `open_index`.
///
/// Returns `None` when `text[open_index]` is not `(` or when the text ends
/// before the paren is closed.  Parens inside strings, quoted identifiers
/// and comments do not count.
pub fn extract_balanced_parens(text: &str, open_index: usize) -> Option<BalancedParens<'_>> {
    if text.as_bytes().get(open_index) != Some(&b'(') {
        return None;
    }

    let start = open_index + 1;
    let mut depth: u32 = 0;

    for (i, b, mode) in Scanner::starting_at(text, start) {
        if mode != LexMode::Code {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' if depth == 0 => {
                return Some(BalancedParens {
                    content: &text[start..i],
                    end_index: i,
                });
            }
            b')' => depth -= 1,
            _ => {}
        }
    }

    None
}

/// Count the commas at paren depth zero in `text`.
///
/// Used by signature help to work out which argument the cursor is in.
pub fn count_top_level_commas(text: &str) -> usize {
    let mut depth: u32 = 0;
    let mut commas = 0;
    for (_, b, mode) in Scanner::new(text) {
        if mode != LexMode::Code {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => commas += 1,
            _ => {}
        }
    }
    commas
}

/// A document with every string, quoted identifier and comment byte
/// replaced by a space.
///
/// Offsets are identical to the source text, so a match found in the
/// masked text can be sliced out of the original.  Newlines inside
/// comments and strings are kept so line numbers survive too.
#[derive(Debug, Clone)]
pub struct CodeMask {
    masked: String,
    code: Vec<bool>,
}

impl CodeMask {
    pub fn new(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(text.len());
        let mut code = Vec::with_capacity(text.len());
        for (_, b, mode) in Scanner::new(text) {
            let is_code = mode == LexMode::Code;
            code.push(is_code);
            bytes.push(if is_code || b == b'\n' { b } else { b' ' });
        }
        // Modes only change on ASCII delimiters, so a multi-byte character
        // is either copied whole or blanked whole.
        let masked = match String::from_utf8(bytes) {
            Ok(masked) => masked,
            Err(_) => text.to_string(),
        };
        Self { masked, code }
    }

    pub fn as_str(&self) -> &str {
        &self.masked
    }

    pub fn len(&self) -> usize {
        self.masked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masked.is_empty()
    }

    /// Whether the byte at `offset` is SQL code.
    pub fn is_code(&self, offset: usize) -> bool {
        self.code.get(offset).copied().unwrap_or(false)
    }
}
