mod common;

use common::{ADD_ONE_SQL, create_sql_workspace, create_test_backend, file_uri, open_document, pos};
use pgsql_lsp::definition::find_definition_in_text;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

#[test]
fn test_definition_in_text() {
    let uri = Url::parse("file:///db/add_one.sql").unwrap();
    let location = find_definition_in_text(&uri, ADD_ONE_SQL, "add_one").unwrap();
    assert_eq!(location.uri, uri);
    assert_eq!(location.range, Range::new(pos(0, 16), pos(0, 23)));
    assert!(find_definition_in_text(&uri, ADD_ONE_SQL, "nope").is_none());
}

#[test]
fn test_definition_from_call_site_and_comment() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///db/add_one.sql").unwrap();

    // From `SELECT add_one(41);`
    let location = backend.resolve_definition(&uri, ADD_ONE_SQL, pos(6, 10)).unwrap();
    assert_eq!(location.range.start, pos(0, 16));

    // From `COMMENT ON FUNCTION add_one(int) ...`
    let location = backend.resolve_definition(&uri, ADD_ONE_SQL, pos(5, 22)).unwrap();
    assert_eq!(location.range.start, pos(0, 16));
}

#[test]
fn test_definition_of_quoted_name_selects_raw_name() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///db/p.sql").unwrap();
    let text = "CREATE PROCEDURE \"My Proc\"(x int) AS $$ BEGIN NULL; END; $$;\nCALL \"my proc\"(1);\n";

    let location = backend.resolve_definition(&uri, text, pos(1, 7)).unwrap();
    assert_eq!(location.range, Range::new(pos(0, 17), pos(0, 26)));
}

#[test]
fn test_definition_of_undeclared_name_is_none() {
    let backend = create_test_backend();
    let uri = Url::parse("file:///db/x.sql").unwrap();
    assert!(backend.resolve_definition(&uri, "SELECT now();\n", pos(0, 8)).is_none());
}

#[tokio::test]
async fn test_goto_definition_across_files() {
    let (backend, dir) = create_sql_workspace(&[
        ("a_first.sql", "SELECT 1;\n"),
        ("functions/add_one.sql", ADD_ONE_SQL),
        ("main.sql", "SELECT add_one(1);\n"),
    ]);
    let main_uri = file_uri(&dir, "main.sql");
    open_document(&backend, &main_uri, "SELECT add_one(1);\n").await;

    let result = backend
        .goto_definition(GotoDefinitionParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri: main_uri },
                position: pos(0, 9),
            },
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap();

    match result {
        Some(GotoDefinitionResponse::Scalar(location)) => {
            assert_eq!(location.uri, file_uri(&dir, "functions/add_one.sql"));
            assert_eq!(location.range.start, pos(0, 16));
        }
        other => panic!("expected a single location, got {other:?}"),
    }
}

#[tokio::test]
async fn test_current_document_wins_over_workspace() {
    let other = "CREATE FUNCTION add_one(y int) RETURNS int AS $$ SELECT y + 1; $$ LANGUAGE sql;\n";
    let (backend, dir) = create_sql_workspace(&[("other.sql", other), ("main.sql", ADD_ONE_SQL)]);
    let main_uri = file_uri(&dir, "main.sql");
    open_document(&backend, &main_uri, ADD_ONE_SQL).await;

    let location = backend
        .resolve_definition(&main_uri, ADD_ONE_SQL, pos(6, 9))
        .unwrap();
    assert_eq!(location.uri, main_uri);
}
