use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use parking_lot::Mutex;
use tower_lsp::Client;

pub mod blocks;
pub mod cache;
pub mod commands;
pub mod completion;
pub mod config;
pub mod definition;
pub mod hover;
pub mod keywords;
pub mod parser;
pub mod references;
pub mod rename;
pub mod scanner;
mod server;
pub mod signature;
pub mod symbols;
pub mod types;
pub mod util;
pub mod workspace;

pub use blocks::BlockResolver;
pub use cache::{CachedDeclaration, DeclarationCache};
pub use config::Config;
pub use keywords::is_postgres_keyword;
pub use parser::{normalize_identifier, parse_declarations, split_parameters};
pub use rename::RenameError;
pub use scanner::{BalancedParens, extract_balanced_parens};
pub use types::*;
pub use workspace::{DocumentSource, Workspace};

use cache::PendingRefresh;

pub struct Backend {
    name: String,
    version: String,
    /// URI → full text of every document open in the editor.
    open_files: Arc<Mutex<HashMap<String, String>>>,
    workspace_root: Arc<Mutex<Option<PathBuf>>>,
    /// Explicit `--config` path, if one was given on the command line.
    config_path: Option<PathBuf>,
    config: Arc<Mutex<Config>>,
    /// Workspace-wide declaration names for completion.
    cache: Arc<Mutex<DeclarationCache>>,
    /// Bumped for every scheduled cache refresh; a refresh only runs if it
    /// is still the latest one when its debounce delay expires.
    cache_generation: Arc<AtomicU64>,
    pending_refresh: Arc<Mutex<PendingRefresh>>,
    client: Option<Client>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_config_path(client, None)
    }

    pub fn with_config_path(client: Client, config_path: Option<PathBuf>) -> Self {
        Self {
            client: Some(client),
            config_path,
            ..Self::new_test()
        }
    }

    pub fn new_test() -> Self {
        Self {
            name: "pgsql-lsp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_files: Arc::new(Mutex::new(HashMap::new())),
            workspace_root: Arc::new(Mutex::new(None)),
            config_path: None,
            config: Arc::new(Mutex::new(Config::default())),
            cache: Arc::new(Mutex::new(DeclarationCache::new())),
            cache_generation: Arc::new(AtomicU64::new(0)),
            pending_refresh: Arc::new(Mutex::new(PendingRefresh::default())),
            client: None,
        }
    }

    /// Create a backend rooted at `root`, with the configuration found
    /// there (or the defaults).
    pub fn new_test_with_workspace(root: PathBuf) -> Self {
        let backend = Self::new_test();
        *backend.config.lock() = Config::load(None, Some(&root));
        *backend.workspace_root.lock() = Some(root);
        backend
    }

    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }

    /// Snapshot of the workspace (root, file filter, open documents) for
    /// serving one request.
    pub fn workspace(&self) -> Workspace {
        snapshot_workspace(&self.open_files, &self.workspace_root, &self.config)
    }

    /// Text of an open document.
    pub fn document_text(&self, uri: &str) -> Option<String> {
        self.open_files.lock().get(uri).cloned()
    }
}

pub(crate) fn snapshot_workspace(
    open_files: &Mutex<HashMap<String, String>>,
    workspace_root: &Mutex<Option<PathBuf>>,
    config: &Mutex<Config>,
) -> Workspace {
    Workspace::new(
        workspace_root.lock().clone(),
        config.lock().workspace.clone(),
        open_files.lock().clone(),
    )
}
