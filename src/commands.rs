//! `workspace/executeCommand` support.
//!
//! Two commands edit documents on the user's behalf:
//!
//! - [`GENERATE_SKELETON`] inserts a `CREATE OR REPLACE FUNCTION|PROCEDURE`
//!   template with a PL/pgSQL body.
//! - [`MOVE_FUNCTION`] moves a declaration (including the `$$ LANGUAGE ...;`
//!   tail of a dollar-quoted body), its leading comment lines and its
//!   `COMMENT ON` statements to the end of another document.
//!
//! Both build a [`WorkspaceEdit`] and hand it to the client through
//! `workspace/applyEdit`, reporting `{"applied": bool}` back.

use std::collections::HashMap;
use std::ops::Range;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;

use crate::Backend;
use crate::blocks::BlockResolver;
use crate::parser::{comment_on_statements, find_declaration};
use crate::scanner::CodeMask;
use crate::types::DeclarationKind;
use crate::util::LineIndex;
use crate::workspace::DocumentSource;

pub const GENERATE_SKELETON: &str = "pgsql.generateSkeleton";
pub const MOVE_FUNCTION: &str = "pgsql.moveFunction";

/// Commands advertised in the server capabilities.
pub const COMMANDS: &[&str] = &[GENERATE_SKELETON, MOVE_FUNCTION];

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("missing command arguments")]
    MissingArguments,
    #[error("invalid command arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
    #[error("cannot read {uri}: {source}")]
    Unreadable {
        uri: Url,
        #[source]
        source: std::io::Error,
    },
    #[error("no function or procedure named {0}")]
    DeclarationNotFound(String),
    #[error("the destination must be a different document")]
    SameDocument,
}

impl From<CommandError> for jsonrpc::Error {
    fn from(err: CommandError) -> Self {
        jsonrpc::Error::invalid_params(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkeletonArgs {
    pub uri: Url,
    pub kind: DeclarationKind,
    pub name: String,
    #[serde(default)]
    pub parameters: String,
    pub returns: Option<String>,
    pub language: Option<String>,
    /// Insertion point; the end of the document when absent.
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveArgs {
    pub uri: Url,
    pub name: String,
    pub destination: Url,
}

/// The text of a new routine.  Functions return `void` unless told
/// otherwise; the language defaults to `plpgsql`.
pub fn render_skeleton(
    kind: DeclarationKind,
    name: &str,
    parameters: &str,
    returns: Option<&str>,
    language: Option<&str>,
) -> String {
    let returns = match kind {
        DeclarationKind::Function => format!("RETURNS {}", returns.unwrap_or("void")),
        DeclarationKind::Procedure => String::new(),
    };
    let return_statement = match kind {
        DeclarationKind::Function => "RETURN NULL;",
        DeclarationKind::Procedure => "RETURN;",
    };
    format!(
        "CREATE OR REPLACE {kind} {name}({params})\n{returns}\nLANGUAGE {language}\nAS $$\nBEGIN\n  -- implementation goes here\n  {return_statement}\nEXCEPTION WHEN OTHERS THEN\n  -- handle\n  RAISE;\nEND;\n$$;\n",
        kind = kind.keyword(),
        params = parameters.trim(),
        language = language.unwrap_or("plpgsql"),
    )
}

fn end_position(text: &str) -> Position {
    LineIndex::new(text).position_of(text, text.len())
}

/// Edit inserting a skeleton into `text` (the current content of
/// `args.uri`).
pub fn skeleton_edit(args: &SkeletonArgs, text: &str) -> WorkspaceEdit {
    let skeleton = render_skeleton(
        args.kind,
        &args.name,
        &args.parameters,
        args.returns.as_deref(),
        args.language.as_deref(),
    );
    let at = args.position.unwrap_or_else(|| end_position(text));
    let changes = HashMap::from([(
        args.uri.clone(),
        vec![TextEdit {
            range: tower_lsp::lsp_types::Range::new(at, at),
            new_text: format!("\n{skeleton}\n"),
        }],
    )]);
    WorkspaceEdit {
        changes: Some(changes),
        ..WorkspaceEdit::default()
    }
}

/// First line of the comment block directly above `decl_line`.  Blank
/// lines and `--` lines are taken greedily; one `/* ... */` block ends the
/// walk.
fn leading_comment_start(text: &str, index: &LineIndex, decl_line: u32) -> u32 {
    let mut start = decl_line;
    for line in (0..decl_line).rev() {
        let trimmed = index.line_text(text, line).trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            start = line;
            continue;
        }
        if trimmed.ends_with("*/") {
            start = (0..=line)
                .rev()
                .find(|&l| index.line_text(text, l).contains("/*"))
                .unwrap_or(line);
        }
        break;
    }
    start
}

/// A dollar-quoted body is closed after the `END;` (`$$ LANGUAGE plpgsql;`).
/// The offset just past that statement's `;`, when there is one before
/// `limit`.
fn body_tail_end(mask: &CodeMask, decl_end: usize, limit: usize) -> Option<usize> {
    let rest = mask.as_str().get(decl_end..limit)?;
    let tail = rest.trim_start();
    if !tail.starts_with('$') {
        return None;
    }
    let skipped = rest.len() - tail.len();
    tail.find(';').map(|semi| decl_end + skipped + semi + 1)
}

/// Byte range covering whole lines `first..=last`.
fn line_span(text: &str, index: &LineIndex, first: u32, last: u32) -> Option<Range<usize>> {
    Some(index.line_range(text, first)?.start..index.line_range(text, last)?.end)
}

/// Edit moving the declaration `name` from `source_text` to the end of
/// `dest_text`.
pub fn move_declaration_edit(
    source_uri: &Url,
    source_text: &str,
    name: &str,
    dest_uri: &Url,
    dest_text: &str,
) -> Result<WorkspaceEdit, CommandError> {
    if source_uri == dest_uri {
        return Err(CommandError::SameDocument);
    }

    let resolver = BlockResolver::new(source_text);
    let decl = find_declaration(resolver.declarations(), name)
        .ok_or_else(|| CommandError::DeclarationNotFound(name.to_string()))?;
    let index = resolver.line_index();

    let decl_line = index.line_of(decl.start);
    let mut end_line = resolver.find_declaration_end(decl_line);
    let next_start = resolver
        .declarations()
        .iter()
        .map(|d| d.start)
        .find(|&start| start > decl.start)
        .unwrap_or(source_text.len());
    if let Some(tail) = body_tail_end(&CodeMask::new(source_text), decl.end, next_start) {
        end_line = end_line.max(index.line_of(tail - 1));
    }
    let first_line = leading_comment_start(source_text, index, decl_line);
    let moved = line_span(source_text, index, first_line, end_line)
        .ok_or_else(|| CommandError::DeclarationNotFound(name.to_string()))?;

    let mut moved_text = source_text[moved.clone()].to_string();
    let mut deletions = vec![moved];

    let mut comment_texts = Vec::new();
    for statement in comment_on_statements(source_text, &decl.raw_name) {
        let first = index.line_of(statement.start);
        let last = index.line_of(statement.end.saturating_sub(1).max(statement.start));
        let Some(lines) = line_span(source_text, index, first, last) else {
            continue;
        };
        if first >= first_line && last <= end_line {
            continue;
        }
        if deletions.iter().any(|d| d.start < lines.end && lines.start < d.end) {
            continue;
        }
        comment_texts.push(source_text[statement].trim().to_string());
        deletions.push(lines);
    }
    if !comment_texts.is_empty() {
        moved_text.push_str("\n\n");
        moved_text.push_str(&comment_texts.join("\n\n"));
    }

    let source_edits = deletions
        .into_iter()
        .map(|range| TextEdit {
            range: index.range_of(source_text, range),
            new_text: String::new(),
        })
        .collect();

    let prefix = if dest_text.trim().is_empty() { "" } else { "\n\n" };
    let at = end_position(dest_text);
    let dest_edit = TextEdit {
        range: tower_lsp::lsp_types::Range::new(at, at),
        new_text: format!("{prefix}{moved_text}\n"),
    };

    tracing::debug!(%source_uri, %dest_uri, %name, "moving declaration");

    let changes = HashMap::from([
        (source_uri.clone(), source_edits),
        (dest_uri.clone(), vec![dest_edit]),
    ]);
    Ok(WorkspaceEdit {
        changes: Some(changes),
        ..WorkspaceEdit::default()
    })
}

fn parse_args<T: for<'de> Deserialize<'de>>(arguments: Vec<Value>) -> Result<T, CommandError> {
    let first = arguments
        .into_iter()
        .next()
        .ok_or(CommandError::MissingArguments)?;
    Ok(serde_json::from_value(first)?)
}

impl Backend {
    /// Build the edit for a command without applying it.
    pub fn command_edit(&self, params: ExecuteCommandParams) -> Result<WorkspaceEdit, CommandError> {
        let workspace = self.workspace();
        let read = |uri: &Url| {
            workspace.open(uri).map_err(|source| CommandError::Unreadable {
                uri: uri.clone(),
                source,
            })
        };

        match params.command.as_str() {
            GENERATE_SKELETON => {
                let args: SkeletonArgs = parse_args(params.arguments)?;
                // A document that does not exist yet starts out empty.
                let text = read(&args.uri).unwrap_or_default();
                Ok(skeleton_edit(&args, &text))
            }
            MOVE_FUNCTION => {
                let args: MoveArgs = parse_args(params.arguments)?;
                if args.uri == args.destination {
                    return Err(CommandError::SameDocument);
                }
                let source_text = read(&args.uri)?;
                let dest_text = read(&args.destination).unwrap_or_default();
                move_declaration_edit(
                    &args.uri,
                    &source_text,
                    &args.name,
                    &args.destination,
                    &dest_text,
                )
            }
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    /// Main command handler, called by `LanguageServer::execute_command`.
    pub(crate) async fn handle_execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> jsonrpc::Result<Option<Value>> {
        let command = params.command.clone();
        let edit = self.command_edit(params)?;
        let applied = self.apply_workspace_edit(edit).await;
        tracing::info!(%command, applied, "command executed");
        Ok(Some(json!({ "applied": applied })))
    }

    /// Ask the client to apply `edit`.  Without a client (tests) nothing is
    /// applied.
    async fn apply_workspace_edit(&self, edit: WorkspaceEdit) -> bool {
        let Some(client) = &self.client else {
            return false;
        };
        match client.apply_edit(edit).await {
            Ok(response) => {
                if let Some(reason) = response.failure_reason {
                    tracing::warn!("client rejected workspace edit: {reason}");
                }
                response.applied
            }
            Err(err) => {
                tracing::warn!("workspace/applyEdit failed: {err}");
                false
            }
        }
    }
}
