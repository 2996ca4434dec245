/// Completion support.
///
/// Offers PostgreSQL keywords (upper-cased) and the name of every routine
/// declared in the current document or anywhere in the workspace.  Each
/// routine item carries the same Markdown documentation as its hover.
///
/// Workspace names come from the declaration cache once it has been
/// built.  Until then the workspace is parsed synchronously and a cache
/// rebuild is scheduled, so completion is correct even with a cold or
/// disabled cache.
use std::collections::HashSet;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::cache::{CachedDeclaration, summarize};
use crate::hover::routine_markdown;
use crate::keywords::POSTGRES_KEYWORDS;
use crate::parser::extract_comment_description;
use crate::scanner::CodeMask;
use crate::util::LineIndex;
use crate::workspace::documents;

/// Detail shown next to routine items.
pub const ROUTINE_DETAIL: &str = "Function/Procedure (Postgres)";

/// Detail shown next to keyword items.
pub const KEYWORD_DETAIL: &str = "Postgres keyword";

/// Keyword completion items, upper-cased, in list order.
pub fn keyword_items() -> Vec<CompletionItem> {
    POSTGRES_KEYWORDS
        .iter()
        .map(|keyword| CompletionItem {
            label: keyword.to_uppercase(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some(KEYWORD_DETAIL.to_string()),
            ..CompletionItem::default()
        })
        .collect()
}

/// Completion item for one routine.  When the declaring file has no
/// `COMMENT ON` for it, one in `current_text` is used instead.
pub fn routine_item(decl: &CachedDeclaration, current_text: &str) -> CompletionItem {
    let description = decl
        .description
        .clone()
        .or_else(|| extract_comment_description(current_text, &decl.name));
    CompletionItem {
        label: decl.name.clone(),
        kind: Some(CompletionItemKind::FUNCTION),
        detail: Some(ROUTINE_DETAIL.to_string()),
        documentation: Some(Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: routine_markdown(
                decl.kind,
                &decl.name,
                &decl.parameters,
                description.as_deref(),
            ),
        })),
        ..CompletionItem::default()
    }
}

/// Whether `offset` is inside a comment or string literal.
fn inside_comment_or_string(text: &str, offset: usize) -> bool {
    if offset == 0 {
        return false;
    }
    let mask = CodeMask::new(text);
    // The byte before the cursor decides; a cursor right after a closing
    // quote is back in code.
    let prev = offset - 1;
    !mask.is_code(prev) && !matches!(text.as_bytes().get(prev), Some(b'\'' | b'"'))
}

impl Backend {
    /// Main completion handler, called by `LanguageServer::completion`.
    pub(crate) async fn handle_completion(
        &self,
        params: CompletionParams,
    ) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(content) = self.document_text(uri.as_str()) else {
            return Ok(None);
        };

        let index = LineIndex::new(&content);
        if let Some(offset) = index.offset_of(&content, position)
            && inside_comment_or_string(&content, offset)
        {
            return Ok(None);
        }

        let items = self.completion_items(&uri, &content);
        Ok(Some(CompletionResponse::Array(items)))
    }

    /// Every completion item available in `uri`: keywords (if enabled),
    /// then routines from the current document, then from the workspace.
    pub fn completion_items(&self, uri: &Url, content: &str) -> Vec<CompletionItem> {
        let config = self.config();
        let mut items = if config.completion.keywords {
            keyword_items()
        } else {
            Vec::new()
        };

        let mut seen = HashSet::new();
        for decl in summarize(uri.as_str(), content) {
            if seen.insert(decl.name.to_lowercase()) {
                items.push(routine_item(&decl, content));
            }
        }

        for decl in self.workspace_declarations(uri) {
            if seen.insert(decl.name.to_lowercase()) {
                items.push(routine_item(&decl, content));
            }
        }

        items
    }

    /// Declarations from the rest of the workspace: from the cache when it
    /// is ready, otherwise parsed right now.
    fn workspace_declarations(&self, uri: &Url) -> Vec<CachedDeclaration> {
        {
            let cache = self.cache.lock();
            if cache.is_ready() {
                return cache
                    .names()
                    .iter()
                    .filter_map(|name| cache.lookup(name))
                    .filter(|decl| decl.uri != uri.as_str())
                    .cloned()
                    .collect();
            }
        }

        if tokio::runtime::Handle::try_current().is_ok() {
            self.schedule_cache_refresh(None);
        }

        let workspace = self.workspace();
        documents(&workspace, Some(uri))
            .flat_map(|(doc_uri, text)| summarize(doc_uri.as_str(), &text))
            .collect()
    }
}
