/// Goto definition support.
///
/// Jumps from a routine name (at a call site, in a `COMMENT ON`, anywhere)
/// to the name in its `CREATE FUNCTION|PROCEDURE` statement.  The current
/// document wins; otherwise the first workspace document declaring the
/// name is used.
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::parser::{find_declaration, normalize_identifier, parse_declarations};
use crate::util::{LineIndex, word_at_position};
use crate::workspace::documents;

/// Location of the declaration of `name` in `text`, if `text` has one.
pub fn find_definition_in_text(uri: &Url, text: &str, name: &str) -> Option<Location> {
    let declarations = parse_declarations(text);
    let found = find_declaration(&declarations, name)?;
    let index = LineIndex::new(text);
    Some(Location {
        uri: uri.clone(),
        range: index.range_of(text, found.name_range()),
    })
}

impl Backend {
    /// Handle a "go to definition" request.
    ///
    /// Returns `None` when there is no word under the cursor or no
    /// document declares it.
    pub fn resolve_definition(&self, uri: &Url, content: &str, position: Position) -> Option<Location> {
        let index = LineIndex::new(content);
        let (_, word) = word_at_position(content, &index, position)?;
        let name = normalize_identifier(&word);

        if let Some(location) = find_definition_in_text(uri, content, &name) {
            return Some(location);
        }

        let workspace = self.workspace();
        documents(&workspace, Some(uri))
            .find_map(|(doc_uri, text)| find_definition_in_text(&doc_uri, &text, &name))
    }
}
