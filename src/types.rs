//! Data types used throughout the pgsql-lsp server.
//!
//! This module contains the "model" structs and enums that represent
//! parsed SQL declarations as well as the rename-related types shared by
//! the classifier and the server handlers.

use std::fmt;
use std::ops::Range;

use serde::Deserialize;

/// Whether a declaration is a `FUNCTION` or a `PROCEDURE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Function,
    Procedure,
}

impl DeclarationKind {
    /// Parse the keyword matched by the declaration anchor.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("function") {
            Some(Self::Function)
        } else if keyword.eq_ignore_ascii_case("procedure") {
            Some(Self::Procedure)
        } else {
            None
        }
    }

    /// Capitalised label used in hover and completion documentation.
    pub fn title(self) -> &'static str {
        match self {
            Self::Function => "Function",
            Self::Procedure => "Procedure",
        }
    }

    /// Upper-case SQL keyword (`FUNCTION` / `PROCEDURE`).
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function => f.write_str("function"),
            Self::Procedure => f.write_str("procedure"),
        }
    }
}

/// One parsed `CREATE [OR REPLACE] FUNCTION|PROCEDURE` statement.
///
/// All offsets are byte offsets into the text the declaration was parsed
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The name exactly as written, possibly double-quoted
    /// (e.g. `"My Proc"` or `public.calc`).
    pub raw_name: String,
    /// `raw_name` with surrounding quotes stripped and `""` collapsed.
    /// Case is preserved; comparisons against it are case-insensitive.
    pub name: String,
    pub kind: DeclarationKind,
    /// Raw text between the outer parameter parens, not yet split.
    pub parameters: String,
    /// Offset of the `CREATE` keyword.
    pub start: usize,
    /// Exclusive end of the declaration (just past its terminating `END;`,
    /// statement `;`, or the end of the search region).
    pub end: usize,
    /// Offset of the first byte of `raw_name`.
    pub name_start: usize,
    /// Offset of the opening `(` of the parameter list.
    pub params_open: usize,
    /// Offset of the closing `)` of the parameter list.
    pub params_close: usize,
}

impl Declaration {
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Byte range of the raw name inside the source text.
    pub fn name_range(&self) -> Range<usize> {
        self.name_start..self.name_start + self.raw_name.len()
    }

    /// Whether `offset` lies inside the half-open span `[start, end)`.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Case-insensitive comparison against an already normalised name.
    pub fn is_named(&self, normalized: &str) -> bool {
        self.name.to_lowercase() == normalized.to_lowercase()
    }

    /// The individual parameters, split on top-level commas.
    pub fn parameter_list(&self) -> Vec<String> {
        crate::parser::split_parameters(&self.parameters)
    }
}

/// How a rename request was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameScope {
    /// The cursor is on the name of the declaration that encloses it.
    Declaration,
    /// The identifier is immediately followed by `(`.
    CallSite,
    /// A parameter or variable: edits stay inside the enclosing
    /// declaration's lines.
    Local {
        start_line: u32,
        end_line: u32,
        context: LocalContext,
    },
    /// No enclosing declaration could be found; renamed globally as a
    /// last resort.
    Unscoped,
}

impl RenameScope {
    /// Whether edits for this scope span the whole workspace.
    pub fn is_global(&self) -> bool {
        !matches!(self, Self::Local { .. })
    }
}

/// Where inside its enclosing declaration a local symbol sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalContext {
    /// Between the parameter list's parens.
    Parameters,
    /// Between `DECLARE` and the following `BEGIN`.
    Declare,
    /// Anywhere else within the declaration's lines.
    Body,
}
