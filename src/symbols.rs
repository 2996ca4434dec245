/// Document outline: one symbol per declaration.
use tower_lsp::lsp_types::*;

use crate::parser::parse_declarations;
use crate::util::LineIndex;

pub fn document_symbols(text: &str) -> Vec<DocumentSymbol> {
    let index = LineIndex::new(text);
    parse_declarations(text)
        .into_iter()
        .map(|decl| {
            // `deprecated` is a required field of the struct.
            #[allow(deprecated)]
            DocumentSymbol {
                name: decl.name.clone(),
                detail: Some(decl.kind.to_string()),
                kind: SymbolKind::FUNCTION,
                tags: None,
                deprecated: None,
                range: index.range_of(text, decl.span()),
                selection_range: index.range_of(text, decl.name_range()),
                children: None,
            }
        })
        .collect()
}
