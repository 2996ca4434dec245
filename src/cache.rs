/// Workspace declaration cache for completion.
///
/// Completion lists every routine declared anywhere in the workspace.
/// Re-parsing every SQL file on each keystroke is too slow, so the server
/// keeps this cache and refreshes it in the background (debounced) when
/// files change.  It is only ever an accelerator: when it is not ready,
/// callers parse the workspace synchronously instead.
///
/// Names are indexed case-insensitively.  A name declared in several files
/// stays available until the last of those files drops it.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use tower_lsp::lsp_types::Url;

use crate::parser::{extract_comment_description, parse_declarations};
use crate::types::DeclarationKind;
use crate::workspace::{DocumentSource, documents};
use crate::{Backend, snapshot_workspace};

/// What completion and hover need to know about one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDeclaration {
    pub name: String,
    pub kind: DeclarationKind,
    /// Trimmed raw parameter list.
    pub parameters: String,
    /// Text of the matching `COMMENT ON` statement, if any.
    pub description: Option<String>,
    /// URI of the file declaring it.
    pub uri: String,
}

#[derive(Debug, Default)]
pub struct DeclarationCache {
    /// URI → declarations in that file, in source order.
    files: HashMap<String, Vec<CachedDeclaration>>,
    /// Lower-cased name → URIs declaring it, in insertion order.
    by_name: HashMap<String, Vec<String>>,
    ready: bool,
}

impl DeclarationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a full rebuild has completed since the cache was created
    /// or last cleared.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn lookup(&self, name: &str) -> Option<&CachedDeclaration> {
        let key = name.to_lowercase();
        let uri = self.by_name.get(&key)?.first()?;
        self.files
            .get(uri)?
            .iter()
            .find(|decl| decl.name.to_lowercase() == key)
    }

    /// Every cached name, once each (first declaration's spelling).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_name
            .keys()
            .filter_map(|key| self.lookup(key).map(|decl| decl.name.clone()))
            .collect();
        names.sort_by_key(|name| name.to_lowercase());
        names
    }

    /// Re-index one file from its current text.
    pub fn update_file(&mut self, uri: &str, text: &str) {
        self.invalidate(uri);

        let declarations = summarize(uri, text);

        for decl in &declarations {
            let uris = self.by_name.entry(decl.name.to_lowercase()).or_default();
            if !uris.iter().any(|u| u == uri) {
                uris.push(uri.to_string());
            }
        }
        self.files.insert(uri.to_string(), declarations);
    }

    /// Forget everything known about `uri` (deleted or unreadable file).
    pub fn invalidate(&mut self, uri: &str) {
        let Some(previous) = self.files.remove(uri) else {
            return;
        };
        for decl in previous {
            let key = decl.name.to_lowercase();
            if let Some(uris) = self.by_name.get_mut(&key) {
                uris.retain(|u| u != uri);
                if uris.is_empty() {
                    self.by_name.remove(&key);
                }
            }
        }
    }

    /// Replace the whole cache with the given `(uri, text)` documents and
    /// mark it ready.
    pub fn rebuild<I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.files.clear();
        self.by_name.clear();
        for (uri, text) in documents {
            self.update_file(&uri, &text);
        }
        self.ready = true;
        tracing::debug!(
            files = self.files.len(),
            names = self.by_name.len(),
            "declaration cache rebuilt"
        );
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Parse `text` into cache records attributed to `uri`.
pub fn summarize(uri: &str, text: &str) -> Vec<CachedDeclaration> {
    parse_declarations(text)
        .into_iter()
        .map(|decl| CachedDeclaration {
            description: extract_comment_description(text, &decl.raw_name),
            parameters: decl.parameters.trim().to_string(),
            name: decl.name,
            kind: decl.kind,
            uri: uri.to_string(),
        })
        .collect()
}

/// Work collected while a debounced refresh is waiting to run.
#[derive(Debug, Default)]
pub(crate) struct PendingRefresh {
    full: bool,
    files: HashSet<String>,
}

impl Backend {
    /// Schedule a debounced cache refresh: of one file when `uri` is
    /// given, of the whole workspace otherwise.  Requests arriving within
    /// the debounce window are merged into a single refresh.
    pub(crate) fn schedule_cache_refresh(&self, uri: Option<&Url>) {
        let settings = self.config.lock().cache.clone();
        if !settings.enabled {
            return;
        }

        {
            let mut pending = self.pending_refresh.lock();
            match uri {
                Some(uri) => {
                    pending.files.insert(uri.to_string());
                }
                None => pending.full = true,
            }
        }

        let generation = self.cache_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.cache_generation);
        let pending = Arc::clone(&self.pending_refresh);
        let cache = Arc::clone(&self.cache);
        let open_files = Arc::clone(&self.open_files);
        let workspace_root = Arc::clone(&self.workspace_root);
        let config = Arc::clone(&self.config);

        tokio::spawn(async move {
            tokio::time::sleep(settings.debounce()).await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }
            let work = std::mem::take(&mut *pending.lock());
            let workspace = snapshot_workspace(&open_files, &workspace_root, &config);

            if work.full {
                let docs: Vec<(String, String)> = documents(&workspace, None)
                    .map(|(uri, text)| (uri.to_string(), text))
                    .collect();
                cache.lock().rebuild(docs);
                return;
            }

            for uri in work.files {
                let text = Url::parse(&uri)
                    .ok()
                    .and_then(|parsed| workspace.open(&parsed).ok());
                let mut cache = cache.lock();
                match text {
                    Some(text) => cache.update_file(&uri, &text),
                    None => cache.invalidate(&uri),
                }
            }
        });
    }

    /// Rebuild the cache from the workspace right away.
    pub fn refresh_cache_now(&self) {
        let workspace = self.workspace();
        let docs: Vec<(String, String)> = documents(&workspace, None)
            .map(|(uri, text)| (uri.to_string(), text))
            .collect();
        self.cache.lock().rebuild(docs);
    }

    /// Look a name up in the cache, if the cache has been built.
    pub fn cached_declaration(&self, name: &str) -> Option<CachedDeclaration> {
        let cache = self.cache.lock();
        if !cache.is_ready() {
            return None;
        }
        cache.lookup(name).cloned()
    }
}
