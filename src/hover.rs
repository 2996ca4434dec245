/// Hover support.
///
/// Hovering a routine name shows its kind, parameter list and the text of
/// its `COMMENT ON` statement.  The current document is searched first,
/// then the workspace, stopping at the first document that declares the
/// name.
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::parser::{extract_comment_description, find_declaration, normalize_identifier, parse_declarations};
use crate::types::DeclarationKind;
use crate::util::{LineIndex, word_at_position};
use crate::workspace::documents;

/// Shown when a routine has no `COMMENT ON` statement.
pub const NO_DESCRIPTION: &str = "No description";

/// Markdown documentation for a routine, shared by hover and completion.
pub fn routine_markdown(
    kind: DeclarationKind,
    name: &str,
    parameters: &str,
    description: Option<&str>,
) -> String {
    let mut md = format!("**{}**: `{}`\n\n", kind.title(), name);
    let parameters = parameters.trim();
    if !parameters.is_empty() {
        md.push_str("**Parameters:**\n```sql\n");
        md.push_str(parameters);
        md.push_str("\n```\n\n");
    }
    md.push_str("**Description:**\n");
    md.push_str(description.unwrap_or(NO_DESCRIPTION));
    md
}

/// Hover text for `word` if `text` declares it.
pub fn hover_markdown_in_text(text: &str, word: &str) -> Option<String> {
    let declarations = parse_declarations(text);
    let found = find_declaration(&declarations, word)?;
    let description = extract_comment_description(text, &found.raw_name);
    Some(routine_markdown(
        found.kind,
        &found.name,
        &found.parameters,
        description.as_deref(),
    ))
}

impl Backend {
    /// Handle a hover request at `position` in the document `uri`.
    pub fn resolve_hover(&self, uri: &Url, content: &str, position: Position) -> Option<Hover> {
        let index = LineIndex::new(content);
        let (word_range, word) = word_at_position(content, &index, position)?;
        let name = normalize_identifier(&word);

        let markdown = hover_markdown_in_text(content, &name).or_else(|| {
            let workspace = self.workspace();
            documents(&workspace, Some(uri)).find_map(|(_, text)| hover_markdown_in_text(&text, &name))
        })?;

        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: markdown,
            }),
            range: Some(index.range_of(content, word_range)),
        })
    }
}
