#![allow(dead_code)]

use pgsql_lsp::Backend;
use std::fs;
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

/// Helper: create a temp workspace holding the given SQL (or other) files,
/// then return a Backend rooted at it.
pub fn create_sql_workspace(files: &[(&str, &str)]) -> (Backend, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for (rel_path, content) in files {
        let full = dir.path().join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create dirs");
        }
        fs::write(&full, content).expect("failed to write file");
    }

    let backend = Backend::new_test_with_workspace(dir.path().to_path_buf());
    (backend, dir)
}

/// `file://` URI of a file inside a temp workspace.
pub fn file_uri(dir: &tempfile::TempDir, rel_path: &str) -> Url {
    Url::from_file_path(dir.path().join(rel_path)).expect("absolute path")
}

pub fn pos(line: u32, character: u32) -> Position {
    Position { line, character }
}

pub async fn open_document(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "sql".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

pub fn text_document_position(uri: &Url, position: Position) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position,
    }
}

/// A plpgsql function `calc(a int)` returning its argument.
pub const CALC_SQL: &str = "\
CREATE FUNCTION calc(a int) RETURNS int AS $$
BEGIN
  RETURN a;
END;
$$ LANGUAGE plpgsql;
";

/// A documented function and a call to it.
pub const ADD_ONE_SQL: &str = "\
CREATE FUNCTION add_one(x int) RETURNS int AS $$
BEGIN
  RETURN x + 1;
END;
$$ LANGUAGE plpgsql;
COMMENT ON FUNCTION add_one(int) IS 'Adds one';
SELECT add_one(41);
";
