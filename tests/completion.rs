mod common;

use common::{ADD_ONE_SQL, CALC_SQL, create_sql_workspace, create_test_backend, file_uri, open_document, pos};
use pgsql_lsp::completion::{KEYWORD_DETAIL, ROUTINE_DETAIL, keyword_items};
use pgsql_lsp::keywords::POSTGRES_KEYWORDS;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

fn completion_params(uri: &Url, position: Position) -> CompletionParams {
    CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    }
}

fn items(response: Option<CompletionResponse>) -> Vec<CompletionItem> {
    match response {
        Some(CompletionResponse::Array(items)) => items,
        Some(CompletionResponse::List(list)) => list.items,
        None => Vec::new(),
    }
}

fn documentation(item: &CompletionItem) -> &str {
    match &item.documentation {
        Some(Documentation::MarkupContent(markup)) => &markup.value,
        other => panic!("expected markdown documentation, got {other:?}"),
    }
}

// ─── Keywords ───────────────────────────────────────────────────────────────

#[test]
fn test_keyword_items_are_upper_case_and_unique() {
    let items = keyword_items();
    assert_eq!(items.len(), POSTGRES_KEYWORDS.len());
    assert!(items.iter().any(|i| i.label == "SELECT"));
    assert!(items.iter().all(|i| i.label == i.label.to_uppercase()));
    assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::KEYWORD)));
    assert!(items.iter().all(|i| i.detail.as_deref() == Some(KEYWORD_DETAIL)));

    let mut labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels.len(), items.len());
}

// ─── Routines ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_completion_offers_keywords_and_local_routines() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///db/add_one.sql").unwrap();
    let text = format!("{ADD_ONE_SQL}SELECT ");
    open_document(&backend, &uri, &text).await;

    let items = items(backend.completion(completion_params(&uri, pos(7, 7))).await.unwrap());
    assert!(items.iter().any(|i| i.label == "SELECT"));

    let add_one = items
        .iter()
        .find(|i| i.label == "add_one")
        .expect("add_one should be offered");
    assert_eq!(add_one.kind, Some(CompletionItemKind::FUNCTION));
    assert_eq!(add_one.detail.as_deref(), Some(ROUTINE_DETAIL));
    assert!(documentation(add_one).starts_with("**Function**: `add_one`"));
    assert!(documentation(add_one).ends_with("Adds one"));
}

#[tokio::test]
async fn test_completion_suppressed_inside_comment_and_string() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///db/x.sql").unwrap();
    open_document(&backend, &uri, "-- add\nSELECT 'ad").await;

    let in_comment = backend.completion(completion_params(&uri, pos(0, 5))).await.unwrap();
    assert!(in_comment.is_none());

    let in_string = backend.completion(completion_params(&uri, pos(1, 10))).await.unwrap();
    assert!(in_string.is_none());
}

#[tokio::test]
async fn test_completion_for_unknown_document_is_none() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///db/never-opened.sql").unwrap();
    let result = backend.completion(completion_params(&uri, pos(0, 0))).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_completion_includes_workspace_routines_without_cache() {
    let (backend, dir) = create_sql_workspace(&[
        ("calc.sql", CALC_SQL),
        ("lib/add_one.sql", ADD_ONE_SQL),
    ]);
    let uri = file_uri(&dir, "main.sql");

    // The cache has not been built yet; the workspace is parsed right away.
    let items = backend.completion_items(&uri, "SELECT ");
    assert!(items.iter().any(|i| i.label == "calc"));
    assert!(items.iter().any(|i| i.label == "add_one"));
}

#[tokio::test]
async fn test_completion_uses_ready_cache() {
    let (backend, dir) = create_sql_workspace(&[("calc.sql", CALC_SQL)]);
    backend.refresh_cache_now();

    // Files added after the rebuild are only seen by the next one.
    std::fs::write(dir.path().join("late.sql"), ADD_ONE_SQL).unwrap();
    let uri = file_uri(&dir, "main.sql");
    let items = backend.completion_items(&uri, "SELECT ");
    assert!(items.iter().any(|i| i.label == "calc"));
    assert!(!items.iter().any(|i| i.label == "add_one"));

    backend.refresh_cache_now();
    let items = backend.completion_items(&uri, "SELECT ");
    assert!(items.iter().any(|i| i.label == "add_one"));
}

#[tokio::test]
async fn test_routine_names_are_offered_once() {
    let (backend, dir) = create_sql_workspace(&[("calc.sql", CALC_SQL), ("copy.sql", CALC_SQL)]);
    let uri = file_uri(&dir, "main.sql");
    let items = backend.completion_items(&uri, CALC_SQL);
    assert_eq!(items.iter().filter(|i| i.label == "calc").count(), 1);
}

#[tokio::test]
async fn test_description_falls_back_to_current_document() {
    let (backend, dir) = create_sql_workspace(&[("calc.sql", CALC_SQL)]);
    let uri = file_uri(&dir, "main.sql");
    let text = "COMMENT ON FUNCTION calc(int) IS 'Returns its input';\n";

    let items = backend.completion_items(&uri, text);
    let calc = items.iter().find(|i| i.label == "calc").unwrap();
    assert!(documentation(calc).ends_with("Returns its input"));
}

#[tokio::test]
async fn test_keywords_can_be_disabled() {
    let (backend, dir) = create_sql_workspace(&[
        (".pgsql-lsp.toml", "[completion]\nkeywords = false\n"),
        ("calc.sql", CALC_SQL),
    ]);
    let uri = file_uri(&dir, "main.sql");
    let items = backend.completion_items(&uri, "SELECT ");
    assert!(!items.iter().any(|i| i.kind == Some(CompletionItemKind::KEYWORD)));
    assert!(items.iter().any(|i| i.label == "calc"));
}
