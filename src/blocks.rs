/// Block-boundary resolution by line.
///
/// Rename needs "which declaration encloses this cursor line" cheaply and
/// by line number.  [`BlockResolver`] answers that on top of the same
/// declaration spans the indexer produces, so both always agree on where
/// a declaration ends.  Lines that do not start a parsed declaration (a
/// truncated `CREATE FUNCTION` without a parameter list, say) fall back to
/// a line-granular BEGIN/END count.
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::parser::{ANCHOR_RE, parse_declarations_masked};
use crate::scanner::{CodeMask, extract_balanced_parens};
use crate::types::{Declaration, LocalContext};
use crate::util::LineIndex;

static BEGIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bbegin\b").unwrap());
static END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bend\b").unwrap());
static END_STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bend\s*;").unwrap());
static DECLARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bdeclare\b").unwrap());

/// Line-oriented view of one document's declarations.
pub struct BlockResolver<'a> {
    text: &'a str,
    index: LineIndex,
    mask: CodeMask,
    declarations: Vec<Declaration>,
}

impl<'a> BlockResolver<'a> {
    pub fn new(text: &'a str) -> Self {
        let mask = CodeMask::new(text);
        let declarations = parse_declarations_masked(text, &mask);
        Self {
            text,
            index: LineIndex::new(text),
            mask,
            declarations,
        }
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    fn last_line(&self) -> u32 {
        self.index.line_count().saturating_sub(1) as u32
    }

    /// Line text with comments and strings blanked out.
    fn code_line(&self, line: u32) -> &str {
        self.index
            .line_range(self.text, line)
            .map_or("", |range| &self.mask.as_str()[range])
    }

    /// The nearest line at or above `line` holding a declaration anchor.
    pub fn find_declaration_start(&self, line: u32) -> Option<u32> {
        let line = line.min(self.last_line());
        (0..=line)
            .rev()
            .find(|&l| ANCHOR_RE.is_match(self.code_line(l)))
    }

    /// The last line of the declaration starting on `start_line`.
    pub fn find_declaration_end(&self, start_line: u32) -> u32 {
        if let Some(decl) = self.declaration_starting_on(start_line) {
            let last_byte = decl.end.saturating_sub(1).max(decl.start);
            return self.index.line_of(last_byte);
        }
        self.find_declaration_end_by_lines(start_line)
    }

    /// Start and end line of the declaration enclosing `line`, if the
    /// line lies within one.
    pub fn enclosing(&self, line: u32) -> Option<(u32, u32)> {
        let start = self.find_declaration_start(line)?;
        let end = self.find_declaration_end(start);
        (line <= end).then_some((start, end))
    }

    fn declaration_starting_on(&self, line: u32) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| self.index.line_of(d.start) == line)
    }

    /// Line-granular fallback: count whole-word BEGIN/END per line; once a
    /// BEGIN was seen, the first line that brings the count to zero and
    /// holds an `END;` ends the block.  Then the first `END;` line, then the
    /// first line with a `;`, then the last line.
    fn find_declaration_end_by_lines(&self, start_line: u32) -> u32 {
        let last = self.last_line();
        let mut depth: i64 = 0;
        let mut saw_begin = false;

        for line in start_line..=last {
            let code = self.code_line(line);
            let begins = BEGIN_RE.find_iter(code).count() as i64;
            let ends = END_RE.find_iter(code).count() as i64;
            if begins > 0 {
                saw_begin = true;
                depth += begins;
            }
            if ends > 0 {
                depth -= ends;
                if saw_begin && depth <= 0 && END_STATEMENT_RE.is_match(code) {
                    return line;
                }
            }
        }

        (start_line..=last)
            .find(|&l| END_STATEMENT_RE.is_match(self.code_line(l)))
            .or_else(|| (start_line..=last).find(|&l| self.code_line(l).contains(';')))
            .unwrap_or(last)
    }

    /// Byte range strictly inside the parameter list parens of the
    /// declaration spanning `start_line..=end_line`.
    pub fn parameter_range(&self, start_line: u32, end_line: u32) -> Option<Range<usize>> {
        if let Some(decl) = self.declaration_starting_on(start_line) {
            return Some(decl.params_open + 1..decl.params_close);
        }

        let region_start = self.index.line_range(self.text, start_line)?.start;
        let region_end = self.index.line_range(self.text, end_line)?.end;
        let open = region_start + self.mask.as_str()[region_start..region_end].find('(')?;
        let parens = extract_balanced_parens(self.text, open)?;
        Some(open + 1..parens.end_index)
    }

    /// Lines from `DECLARE` to the following `BEGIN` (inclusive) within the
    /// given declaration lines.
    pub fn declare_range(&self, start_line: u32, end_line: u32) -> Option<(u32, u32)> {
        let declare = (start_line..=end_line).find(|&l| DECLARE_RE.is_match(self.code_line(l)))?;
        let begin = (declare + 1..=end_line).find(|&l| BEGIN_RE.is_match(self.code_line(l)))?;
        Some((declare, begin))
    }

    /// Where `offset` (on `line`) sits inside the declaration spanning
    /// `start_line..=end_line`.
    pub fn local_context(&self, start_line: u32, end_line: u32, offset: usize) -> LocalContext {
        let line = self.index.line_of(offset);
        if self
            .parameter_range(start_line, end_line)
            .is_some_and(|params| params.contains(&offset))
        {
            LocalContext::Parameters
        } else if self
            .declare_range(start_line, end_line)
            .is_some_and(|(from, to)| (from..=to).contains(&line))
        {
            LocalContext::Declare
        } else {
            LocalContext::Body
        }
    }
}
