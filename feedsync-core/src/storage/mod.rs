mod dropbox;

pub use dropbox::DropboxStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum LinkResolutionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("shared-link endpoint returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },
    #[error("no shared link available for {path}")]
    MissingLink { path: String },
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("folder listing returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("link resolution failed: {0}")]
    LinkResolution(#[from] LinkResolutionError),
}

/// One leaf object under the monitored root, with its normalized public URL.
/// Built per cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageEntry {
    pub path: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct FolderEntry {
    pub path: String,
    pub is_file: bool,
}

/// Raw object-store API. Kept behind a trait so the lister and the engine can
/// be exercised against an in-memory store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Non-recursive listing of the root, in the store's own order.
    async fn list_folder(&self, root_path: &str, token: &str)
        -> Result<Vec<FolderEntry>, ListError>;
    /// Existing direct shared links scoped to exactly `path`, provider order.
    async fn shared_links(&self, path: &str, token: &str)
        -> Result<Vec<String>, LinkResolutionError>;
    async fn create_shared_link(&self, path: &str, token: &str)
        -> Result<CreatedLink, LinkResolutionError>;
}

#[derive(Debug, Clone)]
pub enum CreatedLink {
    Created(String),
    /// The store rejected creation because a link already exists; the caller
    /// re-queries. Happens when another writer wins the creation race.
    AlreadyExists,
}

/// Enumerates files under the root and resolves a durable public link for
/// each. A failure on any single entry aborts the whole listing: a partial
/// manifest is worse than a stale one.
pub struct StorageLister {
    store: Arc<dyn ObjectStore>,
    root_path: String,
}

impl StorageLister {
    pub fn new(store: Arc<dyn ObjectStore>, root_path: impl Into<String>) -> Self {
        Self {
            store,
            root_path: root_path.into(),
        }
    }

    pub async fn list_entries(&self, token: &str) -> Result<Vec<StorageEntry>, ListError> {
        let folder = self.store.list_folder(&self.root_path, token).await?;
        let mut entries = Vec::new();
        for item in folder {
            if !item.is_file {
                continue;
            }
            let link = self.resolve_link(&item.path, token).await?;
            entries.push(StorageEntry {
                public_url: normalize_direct_link(&link),
                path: item.path,
            });
        }
        Ok(entries)
    }

    /// First match wins when multiple links exist for a path; see DESIGN.md
    /// for why provider order is accepted as-is.
    async fn resolve_link(&self, path: &str, token: &str) -> Result<String, LinkResolutionError> {
        let existing = self.store.shared_links(path, token).await?;
        if let Some(first) = existing.into_iter().next() {
            return Ok(first);
        }
        match self.store.create_shared_link(path, token).await? {
            CreatedLink::Created(url) => Ok(url),
            CreatedLink::AlreadyExists => {
                tracing::debug!(target: "storage", path, "lost shared-link creation race, re-querying");
                let links = self.store.shared_links(path, token).await?;
                links
                    .into_iter()
                    .next()
                    .ok_or_else(|| LinkResolutionError::MissingLink {
                        path: path.to_string(),
                    })
            }
        }
    }
}

/// Rewrites a shared link into its directly-fetchable form: the `dl`
/// parameter is dropped, `raw=1` is set, everything else is preserved.
/// A URL with no query string is returned unchanged.
pub fn normalize_direct_link(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };
    if url.query().is_none() {
        return link.to_string();
    }
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "dl" && key != "raw")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("raw", "1");
    }
    url.to_string()
}
