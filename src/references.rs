/// Find-references support.
///
/// Every whole-word, case-insensitive occurrence of the name under the
/// cursor, written plain (`calc`) or quoted (`"calc"`), in the current
/// document and in every workspace document.  This is purely lexical:
/// a local variable that happens to share a routine's name is reported
/// too.
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::parser::{normalize_identifier, parse_declarations};
use crate::util::{LineIndex, find_whole_word, word_at_position};
use crate::workspace::documents;

/// All references to `name` in `text`.
///
/// When `include_declaration` is false, the names inside the document's
/// own `CREATE` statements are left out.
pub fn find_references_in_text(
    uri: &Url,
    text: &str,
    name: &str,
    include_declaration: bool,
) -> Vec<Location> {
    if name.is_empty() {
        return Vec::new();
    }

    let quoted = format!("\"{}\"", name.replace('"', "\"\""));
    let mut ranges = find_whole_word(text, &quoted);
    let plain: Vec<_> = find_whole_word(text, name)
        .into_iter()
        .filter(|r| !ranges.iter().any(|q| q.start <= r.start && r.end <= q.end))
        .collect();
    ranges.extend(plain);
    ranges.sort_by_key(|r| r.start);

    if !include_declaration {
        let declaration_names: Vec<_> = parse_declarations(text)
            .iter()
            .filter(|d| d.is_named(name))
            .map(|d| d.name_range())
            .collect();
        ranges.retain(|r| !declaration_names.contains(r));
    }

    let index = LineIndex::new(text);
    ranges
        .into_iter()
        .map(|range| Location {
            uri: uri.clone(),
            range: index.range_of(text, range),
        })
        .collect()
}

impl Backend {
    /// Handle a "find references" request.
    pub fn find_references(
        &self,
        uri: &Url,
        content: &str,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        let index = LineIndex::new(content);
        let Some((_, word)) = word_at_position(content, &index, position) else {
            return Vec::new();
        };
        let name = normalize_identifier(&word);

        let mut references = find_references_in_text(uri, content, &name, include_declaration);

        let workspace = self.workspace();
        for (doc_uri, text) in documents(&workspace, Some(uri)) {
            references.extend(find_references_in_text(
                &doc_uri,
                &text,
                &name,
                include_declaration,
            ));
        }

        tracing::debug!(%name, count = references.len(), "references resolved");
        references
    }
}
