/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles all LSP protocol messages (initialize, didOpen, didChange,
/// didClose, hover, rename, completion, etc.).  The handlers only unpack
/// parameters and look up document text; the feature logic lives in the
/// per-feature modules.
use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;

use crate::commands::COMMANDS;
use crate::config::Config;
use crate::rename::prepare_rename;
use crate::symbols::document_symbols;
use crate::{Backend, RenameError};

/// Files the client is asked to watch for the declaration cache.
const SQL_FILE_WATCH_GLOB: &str = "**/*.{sql,SQL}";

fn rename_error(err: RenameError) -> Error {
    Error::invalid_params(err.to_string())
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Prefer the first workspace folder; fall back to the legacy root URI.
        #[allow(deprecated)]
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| folder.uri.clone())
            .or(params.root_uri)
            .and_then(|uri| uri.to_file_path().ok());

        *self.config.lock() = Config::load(self.config_path.as_deref(), workspace_root.as_deref());
        *self.workspace_root.lock() = workspace_root;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                document_symbol_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                rename_provider: Some(OneOf::Right(RenameOptions {
                    prepare_provider: Some(true),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                })),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    ..CompletionOptions::default()
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            ..InitializeResult::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        if let Some(client) = &self.client {
            let options = DidChangeWatchedFilesRegistrationOptions {
                watchers: vec![FileSystemWatcher {
                    glob_pattern: SQL_FILE_WATCH_GLOB.to_string().into(),
                    kind: None,
                }],
            };
            let registration = Registration {
                id: "pgsql-lsp-watch-sql".to_string(),
                method: "workspace/didChangeWatchedFiles".to_string(),
                register_options: serde_json::to_value(options).ok(),
            };
            if let Err(err) = client.register_capability(vec![registration]).await {
                tracing::debug!("client refused file watcher registration: {err}");
            }
        }

        self.schedule_cache_refresh(None);

        let root = self.workspace_root.lock().clone();
        match root {
            Some(root) => {
                self.log(
                    MessageType::INFO,
                    format!("pgsql-lsp initialized for {}", root.display()),
                )
                .await;
            }
            None => {
                self.log(MessageType::INFO, "pgsql-lsp initialized!".to_string())
                    .await;
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();

        self.open_files.lock().insert(uri.clone(), doc.text);
        self.schedule_cache_refresh(Some(&doc.uri));

        self.log(MessageType::INFO, format!("Opened file: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        // Full sync: the last change carries the whole document.
        if let Some(change) = params.content_changes.into_iter().last() {
            self.open_files.lock().insert(uri.to_string(), change.text);
            self.schedule_cache_refresh(Some(&uri));
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        self.open_files.lock().remove(uri.as_str());
        // The cache goes back to what is on disk.
        self.schedule_cache_refresh(Some(&uri));

        self.log(MessageType::INFO, format!("Closed file: {}", uri))
            .await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in &params.changes {
            self.schedule_cache_refresh(Some(&change.uri));
        }
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let Some(content) = self.document_text(params.text_document.uri.as_str()) else {
            return Ok(None);
        };
        Ok(Some(DocumentSymbolResponse::Nested(document_symbols(
            &content,
        ))))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(content) = self.document_text(uri.as_str()) else {
            return Ok(None);
        };
        Ok(self.resolve_hover(&uri, &content, position))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        if let Some(content) = self.document_text(uri.as_str())
            && let Some(location) = self.resolve_definition(&uri, &content, position)
        {
            return Ok(Some(GotoDefinitionResponse::Scalar(location)));
        }

        Ok(None)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(content) = self.document_text(uri.as_str()) else {
            return Ok(None);
        };
        let locations = self.find_references(
            &uri,
            &content,
            position,
            params.context.include_declaration,
        );
        Ok((!locations.is_empty()).then_some(locations))
    }

    async fn prepare_rename(
        &self,
        params: TextDocumentPositionParams,
    ) -> Result<Option<PrepareRenameResponse>> {
        let Some(content) = self.document_text(params.text_document.uri.as_str()) else {
            return Ok(None);
        };
        prepare_rename(&content, params.position)
            .map(Some)
            .map_err(rename_error)
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(content) = self.document_text(uri.as_str()) else {
            return Ok(None);
        };
        self.rename_in_workspace(&uri, &content, position, &params.new_name)
            .map(Some)
            .map_err(rename_error)
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        self.handle_completion(params).await
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(content) = self.document_text(uri.as_str()) else {
            return Ok(None);
        };
        Ok(self.resolve_signature_help(&uri, &content, position))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        self.handle_execute_command(params).await
    }
}
