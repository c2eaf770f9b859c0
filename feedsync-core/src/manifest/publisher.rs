use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("document write rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("write response carried no revision marker")]
    MissingRevision,
}

/// Version-controlled document API. `write_document` is the only mutating
/// call in the whole system; the revision argument is the optimistic
/// precondition for replacing existing content.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Current revision marker, or None when the document does not exist.
    async fn read_revision(&self) -> Result<Option<String>, PublishError>;
    /// Write base64-encoded content, returning the new revision marker.
    async fn write_document(
        &self,
        content_b64: &str,
        message: &str,
        revision: Option<&str>,
    ) -> Result<String, PublishError>;
    /// Non-mutating connectivity and permission report.
    async fn diagnostics(&self) -> StoreDiagnostics;
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreDiagnostics {
    pub repo_reachable: bool,
    pub write_access: bool,
    pub document_exists: bool,
    pub revision: Option<String>,
}

/// Read-modify-write over the document store. A concurrent writer that
/// finishes first invalidates our revision marker and the write surfaces a
/// `PublishError::Rejected`; the next scheduled cycle reconciles from a
/// fresh listing.
pub struct ManifestPublisher {
    store: Arc<dyn DocumentStore>,
}

impl ManifestPublisher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn publish(&self, candidate: &[String]) -> Result<String, PublishError> {
        let revision = match self.store.read_revision().await {
            Ok(revision) => revision,
            Err(err) => {
                tracing::warn!(
                    target: "publish",
                    error = %err,
                    "metadata read failed, writing without revision precondition"
                );
                None
            }
        };
        match &revision {
            Some(marker) => {
                tracing::debug!(target: "publish", revision = %marker, "updating published manifest")
            }
            None => tracing::info!(target: "publish", "published manifest absent, creating"),
        }
        let body = serde_json::to_vec_pretty(candidate)?;
        let encoded = STANDARD.encode(body);
        let message = format!(
            "feedsync: update manifest ({} entries) at {}",
            candidate.len(),
            Utc::now().to_rfc3339()
        );
        self.store
            .write_document(&encoded, &message, revision.as_deref())
            .await
    }

    pub async fn diagnostics(&self) -> StoreDiagnostics {
        self.store.diagnostics().await
    }
}
