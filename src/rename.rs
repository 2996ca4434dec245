//! Rename support.
//!
//! A rename request is classified before any edit is produced:
//!
//! 1. The cursor sits on the name of the declaration it is inside:
//!    [`RenameScope::Declaration`], renamed across the workspace.
//! 2. The word is immediately followed by `(`: [`RenameScope::CallSite`],
//!    renamed across the workspace.
//! 3. Otherwise the word is a parameter or variable of the enclosing
//!    declaration ([`RenameScope::Local`]) and only that declaration's lines
//!    are edited.  With no enclosing declaration the rename falls back to
//!    the workspace ([`RenameScope::Unscoped`]).
//!
//! Workspace-wide matching is lexical: every case-insensitive whole-word
//! occurrence in every document is replaced.

use std::collections::HashMap;
use std::ops::Range;

use thiserror::Error;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::blocks::BlockResolver;
use crate::keywords::is_postgres_keyword;
use crate::parser::normalize_identifier;
use crate::types::RenameScope;
use crate::util::{LineIndex, find_whole_word, word_at_position};
use crate::workspace::{DocumentSource, documents};

/// Why a rename was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("Cannot rename at this location.")]
    NoWord,
    #[error("Cannot rename PostgreSQL keywords.")]
    Keyword,
    #[error("The new name must be different from the old one and cannot be a reserved keyword.")]
    InvalidNewName,
    #[error("No changes to apply.")]
    NoChanges,
}

/// The classification of a rename and the edits it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameOutcome {
    pub scope: RenameScope,
    pub edit: WorkspaceEdit,
}

/// Check that the word at `position` can be renamed and return its range.
pub fn prepare_rename(text: &str, position: Position) -> Result<PrepareRenameResponse, RenameError> {
    let index = LineIndex::new(text);
    let (range, word) = word_at_position(text, &index, position).ok_or(RenameError::NoWord)?;
    if is_postgres_keyword(&word) {
        return Err(RenameError::Keyword);
    }
    Ok(PrepareRenameResponse::RangeWithPlaceholder {
        range: index.range_of(text, range),
        placeholder: word,
    })
}

/// Reject an empty replacement, one equal to the old name, or a keyword.
pub fn validate_rename(old_name: &str, new_name: &str) -> Result<(), RenameError> {
    let new_name = new_name.trim();
    if new_name.is_empty() || new_name == old_name || is_postgres_keyword(new_name) {
        return Err(RenameError::InvalidNewName);
    }
    Ok(())
}

/// Decide the scope of renaming `old_name`, found at `word` with the
/// cursor at `offset`.
pub fn classify_rename(
    resolver: &BlockResolver<'_>,
    text: &str,
    word: Range<usize>,
    old_name: &str,
    offset: usize,
) -> RenameScope {
    let normalized = normalize_identifier(old_name);
    if resolver
        .declarations()
        .iter()
        .any(|decl| decl.contains(offset) && decl.is_named(&normalized))
    {
        return RenameScope::Declaration;
    }

    if text[word.end..].trim_start().starts_with('(') {
        return RenameScope::CallSite;
    }

    let line = resolver.line_index().line_of(offset);
    match resolver.enclosing(line) {
        Some((start_line, end_line)) => RenameScope::Local {
            start_line,
            end_line,
            context: resolver.local_context(start_line, end_line, offset),
        },
        None => RenameScope::Unscoped,
    }
}

fn replacement_edits(text: &str, index: &LineIndex, ranges: Vec<Range<usize>>, new_name: &str) -> Vec<TextEdit> {
    ranges
        .into_iter()
        .map(|range| TextEdit {
            range: index.range_of(text, range),
            new_text: new_name.to_string(),
        })
        .collect()
}

/// Edits replacing every whole-word occurrence of `old_name` in `text`.
pub fn document_edits(text: &str, old_name: &str, new_name: &str) -> Vec<TextEdit> {
    let index = LineIndex::new(text);
    replacement_edits(text, &index, find_whole_word(text, old_name), new_name)
}

/// Edits replacing the occurrences of `old_name` on lines
/// `start_line..=end_line` only.
pub fn local_edits(text: &str, start_line: u32, end_line: u32, old_name: &str, new_name: &str) -> Vec<TextEdit> {
    let index = LineIndex::new(text);
    let (Some(first), Some(last)) = (
        index.line_range(text, start_line),
        index.line_range(text, end_line),
    ) else {
        return Vec::new();
    };
    let bounds = first.start..last.end;
    let ranges = find_whole_word(text, old_name)
        .into_iter()
        .filter(|r| r.start >= bounds.start && r.end <= bounds.end)
        .collect();
    replacement_edits(text, &index, ranges, new_name)
}

/// Classify and compute a rename of the word at `position` in `uri`.
///
/// `text` is the current content of `uri`; every other document is read
/// through `source`.
pub fn rename_edits<S>(
    source: &S,
    uri: &Url,
    text: &str,
    position: Position,
    new_name: &str,
) -> Result<RenameOutcome, RenameError>
where
    S: DocumentSource + ?Sized,
{
    let resolver = BlockResolver::new(text);
    let index = resolver.line_index();
    let (word, old_name) = word_at_position(text, index, position).ok_or(RenameError::NoWord)?;
    if is_postgres_keyword(&old_name) {
        return Err(RenameError::Keyword);
    }
    validate_rename(&old_name, new_name)?;
    let new_name = new_name.trim();
    let offset = index.offset_of(text, position).ok_or(RenameError::NoWord)?;

    let scope = classify_rename(&resolver, text, word, &old_name, offset);
    tracing::debug!(%uri, %old_name, %new_name, ?scope, "rename classified");

    let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();
    match scope {
        RenameScope::Local {
            start_line,
            end_line,
            ..
        } => {
            let edits = local_edits(text, start_line, end_line, &old_name, new_name);
            if !edits.is_empty() {
                changes.insert(uri.clone(), edits);
            }
        }
        _ => {
            if matches!(scope, RenameScope::Unscoped) {
                tracing::info!(%old_name, "no enclosing declaration, renaming across the workspace");
            }
            let edits = document_edits(text, &old_name, new_name);
            if !edits.is_empty() {
                changes.insert(uri.clone(), edits);
            }
            for (doc_uri, doc_text) in documents(source, Some(uri)) {
                let edits = document_edits(&doc_text, &old_name, new_name);
                if !edits.is_empty() {
                    changes.insert(doc_uri, edits);
                }
            }
        }
    }

    if changes.is_empty() {
        return Err(RenameError::NoChanges);
    }
    Ok(RenameOutcome {
        scope,
        edit: WorkspaceEdit {
            changes: Some(changes),
            ..WorkspaceEdit::default()
        },
    })
}

impl Backend {
    /// Handle a rename request against the live workspace.
    pub fn rename_in_workspace(
        &self,
        uri: &Url,
        text: &str,
        position: Position,
        new_name: &str,
    ) -> Result<WorkspaceEdit, RenameError> {
        let workspace = self.workspace();
        rename_edits(&workspace, uri, text, position, new_name).map(|outcome| outcome.edit)
    }
}
