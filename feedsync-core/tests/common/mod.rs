#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use feedsync_core::{
    AccessToken, AuthError, CompareFetchError, CreatedLink, DocumentStore, FolderEntry,
    LinkResolutionError, ListError, ManifestDiffer, ManifestPublisher, ObjectStore, PublishError,
    PublishedSource, StorageLister, StoreDiagnostics, SyncEngine, TokenSource,
};

pub struct StaticTokenSource;

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn obtain_access_token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            secret: "test-token".into(),
            expires_in: Some(14400),
        })
    }
}

pub struct FailingTokenSource {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl TokenSource for FailingTokenSource {
    async fn obtain_access_token(&self) -> Result<AccessToken, AuthError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuthError::Status {
            status: 401,
            body: "invalid_grant".into(),
        })
    }
}

/// In-memory object store. Created links are remembered so a second cycle
/// finds them as existing shared links, mirroring the real provider.
pub struct MockObjectStore {
    pub folder: Vec<FolderEntry>,
    pub links: Mutex<HashMap<String, Vec<String>>>,
    pub fail_create_for: Option<String>,
    pub list_calls: AtomicUsize,
}

impl MockObjectStore {
    pub fn with_files(paths: &[&str]) -> Self {
        Self {
            folder: paths
                .iter()
                .map(|path| FolderEntry {
                    path: (*path).to_string(),
                    is_file: true,
                })
                .collect(),
            links: Mutex::new(HashMap::new()),
            fail_create_for: None,
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn list_folder(
        &self,
        _root_path: &str,
        _token: &str,
    ) -> Result<Vec<FolderEntry>, ListError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.folder.clone())
    }

    async fn shared_links(
        &self,
        path: &str,
        _token: &str,
    ) -> Result<Vec<String>, LinkResolutionError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_shared_link(
        &self,
        path: &str,
        _token: &str,
    ) -> Result<CreatedLink, LinkResolutionError> {
        if self.fail_create_for.as_deref() == Some(path) {
            return Err(LinkResolutionError::Status {
                status: 500,
                path: path.to_string(),
                body: "internal error".into(),
            });
        }
        let url = format!("https://host{path}?dl=0");
        self.links
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(url.clone());
        Ok(CreatedLink::Created(url))
    }
}

/// Shared document state: what the document store holds and what the public
/// manifest URL would serve.
#[derive(Default)]
pub struct DocumentState {
    pub revision: Option<String>,
    pub content: Option<Vec<String>>,
    pub writes: usize,
}

impl DocumentState {
    pub fn published(revision: &str, content: &[&str]) -> Arc<Mutex<DocumentState>> {
        Arc::new(Mutex::new(DocumentState {
            revision: Some(revision.to_string()),
            content: Some(content.iter().map(|url| url.to_string()).collect()),
            writes: 0,
        }))
    }

    pub fn empty() -> Arc<Mutex<DocumentState>> {
        Arc::new(Mutex::new(DocumentState::default()))
    }
}

pub struct MockDocumentStore {
    pub state: Arc<Mutex<DocumentState>>,
    pub reject_writes: bool,
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn read_revision(&self) -> Result<Option<String>, PublishError> {
        Ok(self.state.lock().unwrap().revision.clone())
    }

    async fn write_document(
        &self,
        content_b64: &str,
        _message: &str,
        revision: Option<&str>,
    ) -> Result<String, PublishError> {
        if self.reject_writes {
            return Err(PublishError::Rejected {
                status: 409,
                body: "stale revision marker".into(),
            });
        }
        let mut state = self.state.lock().unwrap();
        if state.revision.as_deref() != revision {
            return Err(PublishError::Rejected {
                status: 409,
                body: "sha mismatch".into(),
            });
        }
        let bytes = STANDARD.decode(content_b64).expect("content is base64");
        let urls: Vec<String> = serde_json::from_slice(&bytes).expect("content is a JSON array");
        state.writes += 1;
        let next = format!("rev-{}", state.writes);
        state.revision = Some(next.clone());
        state.content = Some(urls);
        Ok(next)
    }

    async fn diagnostics(&self) -> StoreDiagnostics {
        let state = self.state.lock().unwrap();
        StoreDiagnostics {
            repo_reachable: true,
            write_access: !self.reject_writes,
            document_exists: state.content.is_some(),
            revision: state.revision.clone(),
        }
    }
}

/// Serves whatever the document state currently holds; an absent document
/// reads as a 404, exercising the conservative-changed path.
pub struct MockPublishedSource {
    pub state: Arc<Mutex<DocumentState>>,
}

#[async_trait]
impl PublishedSource for MockPublishedSource {
    async fn fetch_published(&self) -> Result<Vec<String>, CompareFetchError> {
        match self.state.lock().unwrap().content.clone() {
            Some(urls) => Ok(urls),
            None => Err(CompareFetchError::Status { status: 404 }),
        }
    }
}

pub fn engine_with(
    object: Arc<MockObjectStore>,
    state: Arc<Mutex<DocumentState>>,
    reject_writes: bool,
) -> SyncEngine {
    let lister = StorageLister::new(object, "/hls");
    let differ = ManifestDiffer::new(Arc::new(MockPublishedSource {
        state: state.clone(),
    }));
    let publisher = ManifestPublisher::new(Arc::new(MockDocumentStore {
        state,
        reject_writes,
    }));
    SyncEngine::new(Arc::new(StaticTokenSource), lister, differ, publisher)
}

pub fn engine_with_tokens(
    tokens: Arc<dyn TokenSource>,
    object: Arc<MockObjectStore>,
    state: Arc<Mutex<DocumentState>>,
) -> SyncEngine {
    let lister = StorageLister::new(object, "/hls");
    let differ = ManifestDiffer::new(Arc::new(MockPublishedSource {
        state: state.clone(),
    }));
    let publisher = ManifestPublisher::new(Arc::new(MockDocumentStore {
        state,
        reject_writes: false,
    }));
    SyncEngine::new(tokens, lister, differ, publisher)
}
