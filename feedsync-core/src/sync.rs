use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthError, DropboxTokenProvider, TokenSource};
use crate::config::{Credentials, FeedsyncConfig};
use crate::manifest::{
    CompareFetchError, GithubContentStore, HttpPublishedSource, ManifestDiffer, ManifestPublisher,
    PublishError, StoreDiagnostics,
};
use crate::storage::{DropboxStore, ListError, StorageLister};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("credential exchange failed: {0}")]
    Auth(#[from] AuthError),
    #[error("storage listing failed: {0}")]
    List(#[from] ListError),
    #[error("manifest publish failed: {0}")]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Skipped,
    Published { revision: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub urls: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// One reconciliation cycle: fresh token, full listing, compare, publish on
/// change. The publish is the last and only mutating step, so a failure on
/// any edge leaves the published manifest exactly as it was.
pub struct SyncEngine {
    tokens: Arc<dyn TokenSource>,
    lister: StorageLister,
    differ: ManifestDiffer,
    publisher: ManifestPublisher,
}

impl SyncEngine {
    pub fn new(
        tokens: Arc<dyn TokenSource>,
        lister: StorageLister,
        differ: ManifestDiffer,
        publisher: ManifestPublisher,
    ) -> Self {
        Self {
            tokens,
            lister,
            differ,
            publisher,
        }
    }

    /// Wires the production stores onto one shared HTTP client.
    pub fn from_config(client: Client, config: &FeedsyncConfig, credentials: Credentials) -> Self {
        let publish_token = credentials.publish_token.clone();
        let tokens = Arc::new(DropboxTokenProvider::new(
            client.clone(),
            &config.storage.token_endpoint,
            credentials,
        ));
        let store = Arc::new(DropboxStore::new(client.clone(), &config.storage.api_base));
        let lister = StorageLister::new(store, &config.storage.root_path);
        let source = Arc::new(HttpPublishedSource::new(
            client.clone(),
            &config.publish.public_url,
            &config.sync.user_agent,
        ));
        let differ = ManifestDiffer::new(source);
        let documents = Arc::new(GithubContentStore::new(
            client,
            config.publish.clone(),
            publish_token,
            &config.sync.user_agent,
        ));
        let publisher = ManifestPublisher::new(documents);
        Self::new(tokens, lister, differ, publisher)
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let token = self.tokens.obtain_access_token().await?;
        if let Some(expires_in) = token.expires_in {
            tracing::debug!(target: "sync", expires_in, "obtained fresh access token");
        }

        let entries = self.lister.list_entries(&token.secret).await?;
        let urls: Vec<String> = entries
            .iter()
            .map(|entry| entry.public_url.clone())
            .collect();
        tracing::info!(target: "sync", count = urls.len(), "listed storage entries");

        let outcome = if self.differ.has_changed(&urls).await {
            let revision = self.publisher.publish(&urls).await?;
            tracing::info!(target: "sync", revision = %revision, "published manifest update");
            CycleOutcome::Published { revision }
        } else {
            tracing::info!(target: "sync", "published manifest already current, skipping");
            CycleOutcome::Skipped
        };

        Ok(CycleReport {
            outcome,
            urls,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        })
    }

    /// Read-only view of the published manifest; never triggers a cycle.
    pub async fn fetch_published(&self) -> Result<Vec<String>, CompareFetchError> {
        self.differ.fetch_published().await
    }

    pub async fn store_diagnostics(&self) -> StoreDiagnostics {
        self.publisher.diagnostics().await
    }
}
