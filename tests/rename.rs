mod common;

use std::collections::HashMap;
use std::io;

use common::{CALC_SQL, create_sql_workspace, file_uri, open_document, pos};
use pgsql_lsp::rename::{prepare_rename, rename_edits, validate_rename};
use pgsql_lsp::{DocumentSource, LocalContext, RenameError, RenameScope};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

/// In-memory documents; URIs without text fail to open.
struct MemorySource {
    docs: Vec<(Url, Option<String>)>,
}

impl DocumentSource for MemorySource {
    fn candidate_files(&self) -> Vec<Url> {
        self.docs.iter().map(|(uri, _)| uri.clone()).collect()
    }

    fn open(&self, uri: &Url) -> io::Result<String> {
        self.docs
            .iter()
            .find(|(u, _)| u == uri)
            .and_then(|(_, text)| text.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "gone"))
    }
}

fn uri(name: &str) -> Url {
    Url::parse(&format!("file:///db/{name}")).unwrap()
}

fn scenario_source() -> MemorySource {
    MemorySource {
        docs: vec![
            (uri("calc.sql"), Some(CALC_SQL.to_string())),
            (uri("report.sql"), Some("SELECT calc(5);\nSELECT a FROM t;\n".to_string())),
            (uri("missing.sql"), None),
        ],
    }
}

fn changes(edit: &WorkspaceEdit) -> &HashMap<Url, Vec<TextEdit>> {
    edit.changes.as_ref().expect("edit should use `changes`")
}

// ─── Prepare / Validate ─────────────────────────────────────────────────────

#[test]
fn test_prepare_rename_returns_word_range() {
    let result = prepare_rename(CALC_SQL, pos(0, 17)).unwrap();
    match result {
        PrepareRenameResponse::RangeWithPlaceholder { range, placeholder } => {
            assert_eq!(placeholder, "calc");
            assert_eq!(range, Range::new(pos(0, 16), pos(0, 20)));
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[test]
fn test_prepare_rename_rejects_keyword() {
    let text = "SELECT calc(1);\nselect 2;\n";
    assert_eq!(prepare_rename(text, pos(0, 2)), Err(RenameError::Keyword));
    assert_eq!(prepare_rename(text, pos(1, 6)), Err(RenameError::Keyword));
}

#[test]
fn test_prepare_rename_rejects_no_word() {
    assert_eq!(prepare_rename("   \n", pos(0, 1)), Err(RenameError::NoWord));
    assert_eq!(prepare_rename("x", pos(5, 0)), Err(RenameError::NoWord));
}

#[test]
fn test_validate_rename() {
    assert!(validate_rename("calc", "compute").is_ok());
    assert_eq!(validate_rename("calc", ""), Err(RenameError::InvalidNewName));
    assert_eq!(validate_rename("calc", "calc"), Err(RenameError::InvalidNewName));
    assert_eq!(validate_rename("calc", "SELECT"), Err(RenameError::InvalidNewName));
}

#[test]
fn test_error_messages() {
    assert_eq!(RenameError::NoWord.to_string(), "Cannot rename at this location.");
    assert_eq!(
        RenameError::Keyword.to_string(),
        "Cannot rename PostgreSQL keywords."
    );
    assert_eq!(RenameError::NoChanges.to_string(), "No changes to apply.");
}

// ─── Classification ─────────────────────────────────────────────────────────

#[test]
fn test_rename_declaration_name_is_global() {
    let source = scenario_source();
    let outcome = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(0, 17), "compute").unwrap();
    assert_eq!(outcome.scope, RenameScope::Declaration);

    let changes = changes(&outcome.edit);
    assert_eq!(changes.len(), 2, "declaration file and call-site file");

    let own = &changes[&uri("calc.sql")];
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].range, Range::new(pos(0, 16), pos(0, 20)));
    assert_eq!(own[0].new_text, "compute");

    let report = &changes[&uri("report.sql")];
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].range, Range::new(pos(0, 7), pos(0, 11)));
}

#[test]
fn test_rename_parameter_in_body_is_local() {
    let source = scenario_source();
    // Cursor on `a` in `RETURN a;`.
    let outcome = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(2, 9), "amount").unwrap();
    assert_eq!(
        outcome.scope,
        RenameScope::Local {
            start_line: 0,
            end_line: 3,
            context: LocalContext::Body,
        }
    );

    let changes = changes(&outcome.edit);
    assert_eq!(changes.len(), 1, "only the declaring file is touched");
    let edits = &changes[&uri("calc.sql")];
    let ranges: Vec<Range> = edits.iter().map(|e| e.range).collect();
    assert_eq!(
        ranges,
        vec![
            Range::new(pos(0, 21), pos(0, 22)),
            Range::new(pos(2, 9), pos(2, 10)),
        ]
    );
}

#[test]
fn test_rename_parameter_in_signature_is_local() {
    let source = scenario_source();
    let outcome = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(0, 21), "amount").unwrap();
    assert!(matches!(
        outcome.scope,
        RenameScope::Local {
            context: LocalContext::Parameters,
            ..
        }
    ));
    assert!(!outcome.scope.is_global());
}

#[test]
fn test_rename_call_site_is_global() {
    let source = scenario_source();
    let text = "SELECT calc(5);\nSELECT a FROM t;\n";
    let outcome = rename_edits(&source, &uri("report.sql"), text, pos(0, 8), "compute").unwrap();
    assert_eq!(outcome.scope, RenameScope::CallSite);

    let changes = changes(&outcome.edit);
    assert!(changes.contains_key(&uri("report.sql")));
    assert!(changes.contains_key(&uri("calc.sql")));
}

#[test]
fn test_rename_outside_declaration_falls_back_to_global() {
    let source = scenario_source();
    let text = "SELECT a FROM t;\n";
    let outcome = rename_edits(&source, &uri("report.sql"), text, pos(0, 7), "b").unwrap();
    assert_eq!(outcome.scope, RenameScope::Unscoped);
    assert!(outcome.scope.is_global());

    // Lexical matching reaches the parameter in calc.sql too.
    let changes = changes(&outcome.edit);
    assert_eq!(changes[&uri("calc.sql")].len(), 2);
}

/// A function without dollar quotes declaring a local variable.
const DECLARE_VAR_SQL: &str = "\
CREATE FUNCTION calc(a int)
RETURNS int AS
DECLARE
  x int;
BEGIN
  x := a;
  RETURN x;
END;
";

fn declare_var_source() -> MemorySource {
    MemorySource {
        docs: vec![
            (uri("calc.sql"), Some(DECLARE_VAR_SQL.to_string())),
            (uri("other.sql"), Some("SELECT x FROM t;\n".to_string())),
        ],
    }
}

#[test]
fn test_rename_declared_variable_in_unquoted_body_is_local() {
    let source = declare_var_source();
    // Cursor on `x` in `x := a;`.
    let outcome = rename_edits(&source, &uri("calc.sql"), DECLARE_VAR_SQL, pos(5, 2), "total").unwrap();
    assert_eq!(
        outcome.scope,
        RenameScope::Local {
            start_line: 0,
            end_line: 7,
            context: LocalContext::Body,
        }
    );

    let changes = changes(&outcome.edit);
    assert_eq!(changes.len(), 1, "other.sql must not be touched");
    let ranges: Vec<Range> = changes[&uri("calc.sql")].iter().map(|e| e.range).collect();
    assert_eq!(
        ranges,
        vec![
            Range::new(pos(3, 2), pos(3, 3)),
            Range::new(pos(5, 2), pos(5, 3)),
            Range::new(pos(6, 9), pos(6, 10)),
        ]
    );
}

#[test]
fn test_rename_declared_variable_from_declare_section() {
    let source = declare_var_source();
    let outcome = rename_edits(&source, &uri("calc.sql"), DECLARE_VAR_SQL, pos(3, 2), "total").unwrap();
    assert!(matches!(
        outcome.scope,
        RenameScope::Local {
            context: LocalContext::Declare,
            ..
        }
    ));
    assert!(!changes(&outcome.edit).contains_key(&uri("other.sql")));
}

#[test]
fn test_rename_inserts_trimmed_new_name() {
    let source = scenario_source();
    let outcome = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(0, 17), " compute ").unwrap();
    for edits in changes(&outcome.edit).values() {
        assert!(edits.iter().all(|e| e.new_text == "compute"));
    }
}

#[test]
fn test_rename_rejects_invalid_new_name() {
    let source = scenario_source();
    let result = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(0, 17), "calc");
    assert_eq!(result.unwrap_err(), RenameError::InvalidNewName);

    let result = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(0, 17), "begin");
    assert_eq!(result.unwrap_err(), RenameError::InvalidNewName);
}

#[test]
fn test_rename_rejects_keyword_target() {
    let source = scenario_source();
    let result = rename_edits(&source, &uri("calc.sql"), CALC_SQL, pos(1, 2), "start");
    assert_eq!(result.unwrap_err(), RenameError::Keyword);
}

#[test]
fn test_rename_is_case_insensitive() {
    let source = MemorySource { docs: Vec::new() };
    let text = "CREATE FUNCTION Calc() RETURNS int AS $$ BEGIN RETURN 1; END; $$;\nSELECT CALC();\n";
    let outcome = rename_edits(&source, &uri("x.sql"), text, pos(0, 17), "compute").unwrap();
    assert_eq!(outcome.scope, RenameScope::Declaration);
    assert_eq!(changes(&outcome.edit)[&uri("x.sql")].len(), 2);
}

// ─── Through the Server ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_rename_across_workspace_files() {
    let (backend, dir) = create_sql_workspace(&[
        ("calc.sql", CALC_SQL),
        ("reports/usage.sql", "SELECT calc(5);\n"),
        ("notes.txt", "calc(1)"),
    ]);
    let calc_uri = file_uri(&dir, "calc.sql");
    open_document(&backend, &calc_uri, CALC_SQL).await;

    let edit = backend
        .rename(RenameParams {
            text_document_position: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier {
                    uri: calc_uri.clone(),
                },
                position: pos(0, 17),
            },
            new_name: "compute".to_string(),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
        .expect("rename should produce an edit");

    let changes = changes(&edit);
    assert_eq!(changes.len(), 2);
    assert!(changes.contains_key(&calc_uri));
    assert!(changes.contains_key(&file_uri(&dir, "reports/usage.sql")));
}

#[tokio::test]
async fn test_rename_keyword_is_invalid_params_error() {
    let (backend, dir) = create_sql_workspace(&[("calc.sql", CALC_SQL)]);
    let calc_uri = file_uri(&dir, "calc.sql");
    open_document(&backend, &calc_uri, CALC_SQL).await;

    let err = backend
        .prepare_rename(TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: calc_uri },
            position: pos(1, 1),
        })
        .await
        .unwrap_err();
    assert_eq!(err.message, "Cannot rename PostgreSQL keywords.");
}
