/// Workspace document access.
///
/// Cross-file features (global rename, references, workspace-wide hover
/// and definition, the completion cache) need two things from the editor
/// side: the list of candidate SQL files, and the current text of any one
/// of them.  [`DocumentSource`] is that seam.  [`Workspace`] is the
/// server's implementation: it walks the workspace root with the `ignore`
/// crate (so `.gitignore` is honoured) and prefers the text of documents
/// open in the editor over what is on disk.
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use tower_lsp::lsp_types::Url;

use crate::config::WorkspaceConfig;

/// Enumerates and opens workspace documents.
pub trait DocumentSource {
    /// Every candidate SQL document.
    fn candidate_files(&self) -> Vec<Url>;

    /// The current text of `uri`.
    fn open(&self, uri: &Url) -> io::Result<String>;
}

/// Lazily open every candidate document except `skip`.
///
/// Documents that fail to open are logged and skipped; one unreadable file
/// never aborts a workspace-wide search.  The iterator is lazy, so
/// "find one" callers stop opening files at the first match.
pub fn documents<'s, S>(source: &'s S, skip: Option<&'s Url>) -> impl Iterator<Item = (Url, String)> + 's
where
    S: DocumentSource + ?Sized,
{
    source
        .candidate_files()
        .into_iter()
        .filter(move |uri| Some(uri) != skip)
        .filter_map(move |uri| match source.open(&uri) {
            Ok(text) => Some((uri, text)),
            Err(err) => {
                tracing::debug!(%uri, "skipping unreadable document: {err}");
                None
            }
        })
}

/// Snapshot of the workspace used to serve one request.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    root: Option<PathBuf>,
    settings: WorkspaceConfig,
    /// Text of documents open in the editor, keyed by URI string.
    overlay: HashMap<String, String>,
}

impl Workspace {
    pub fn new(
        root: Option<PathBuf>,
        settings: WorkspaceConfig,
        overlay: HashMap<String, String>,
    ) -> Self {
        Self {
            root,
            settings,
            overlay,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// All files under the root matching the include globs and none of the
    /// exclude globs.
    pub fn sql_files(&self) -> Vec<PathBuf> {
        let Some(root) = &self.root else {
            return Vec::new();
        };

        let mut builder = OverrideBuilder::new(root);
        for glob in &self.settings.include {
            if let Err(err) = builder.add(glob) {
                tracing::warn!(%glob, "ignoring invalid include glob: {err}");
            }
        }
        for glob in &self.settings.exclude {
            if let Err(err) = builder.add(&format!("!{glob}")) {
                tracing::warn!(%glob, "ignoring invalid exclude glob: {err}");
            }
        }
        let overrides = match builder.build() {
            Ok(overrides) => overrides,
            Err(err) => {
                tracing::warn!("cannot build workspace file filter: {err}");
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = WalkBuilder::new(root)
            .overrides(overrides)
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::debug!("workspace walk error: {err}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }
}

impl DocumentSource for Workspace {
    fn candidate_files(&self) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut uris: Vec<Url> = self
            .sql_files()
            .iter()
            .filter_map(|path| Url::from_file_path(path).ok())
            .filter(|uri| seen.insert(uri.to_string()))
            .collect();

        // Open documents that are not on disk under the root (unsaved
        // buffers, files outside the workspace) still take part.
        let mut extra: Vec<Url> = self
            .overlay
            .keys()
            .filter(|key| !seen.contains(*key))
            .filter_map(|key| Url::parse(key).ok())
            .collect();
        extra.sort();
        uris.extend(extra);
        uris
    }

    fn open(&self, uri: &Url) -> io::Result<String> {
        if let Some(text) = self.overlay.get(uri.as_str()) {
            return Ok(text.clone());
        }
        let path = uri
            .to_file_path()
            .map_err(|()| io::Error::new(io::ErrorKind::InvalidInput, format!("not a file URI: {uri}")))?;
        std::fs::read_to_string(path)
    }
}
