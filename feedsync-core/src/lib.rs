pub mod auth;
pub mod config;
pub mod error;
pub mod manifest;
pub mod scheduler;
pub mod server;
pub mod storage;
pub mod sync;

pub use auth::{AccessToken, AuthError, DropboxTokenProvider, TokenSource};
pub use config::{
    credential_presence, load_feedsync_config, CredentialPresence, Credentials, FeedsyncConfig,
    PublishSection, ServerSection, StorageSection, SyncSection,
};
pub use error::{ConfigError, Result};
pub use manifest::{
    CompareFetchError, DocumentStore, GithubContentStore, HttpPublishedSource, ManifestDiffer,
    ManifestPublisher, PublishError, PublishedSource, StoreDiagnostics,
};
pub use scheduler::IntervalScheduler;
pub use server::{build_router, serve, ServerError};
pub use storage::{
    normalize_direct_link, CreatedLink, DropboxStore, FolderEntry, LinkResolutionError, ListError,
    ObjectStore, StorageEntry, StorageLister,
};
pub use sync::{CycleOutcome, CycleReport, SyncEngine, SyncError};
