use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header;
use reqwest::Client;
use thiserror::Error;

/// Soft failure: logged by the differ and treated as "changed", never
/// surfaced to the cycle.
#[derive(Debug, Error)]
pub enum CompareFetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("manifest fetch returned {status}")]
    Status { status: u16 },
    #[error("published manifest is not an array of strings")]
    Shape,
}

#[async_trait]
pub trait PublishedSource: Send + Sync {
    async fn fetch_published(&self) -> Result<Vec<String>, CompareFetchError>;
}

/// Reads the published manifest over plain HTTP with a cache-defeating
/// query parameter, so a CDN in front of the document never serves a stale
/// baseline for the comparison.
pub struct HttpPublishedSource {
    client: Client,
    url: String,
    user_agent: String,
}

impl HttpPublishedSource {
    pub fn new(client: Client, url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl PublishedSource for HttpPublishedSource {
    async fn fetch_published(&self) -> Result<Vec<String>, CompareFetchError> {
        let bust = Utc::now().timestamp_millis().to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("ts", bust.as_str())])
            .header(header::USER_AGENT, &self.user_agent)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CompareFetchError::Status {
                status: status.as_u16(),
            });
        }
        let value: serde_json::Value = response.json().await?;
        parse_manifest(&value).ok_or(CompareFetchError::Shape)
    }
}

fn parse_manifest(value: &serde_json::Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Decides whether the candidate list warrants a publish. Comparison is by
/// value and order; an unreadable or malformed baseline counts as changed so
/// a broken read path can never stall publishing forever.
pub struct ManifestDiffer {
    source: Arc<dyn PublishedSource>,
}

impl ManifestDiffer {
    pub fn new(source: Arc<dyn PublishedSource>) -> Self {
        Self { source }
    }

    pub async fn has_changed(&self, candidate: &[String]) -> bool {
        match self.source.fetch_published().await {
            Ok(published) => published.as_slice() != candidate,
            Err(err) => {
                tracing::warn!(
                    target: "sync",
                    error = %err,
                    "could not read published manifest, assuming changed"
                );
                true
            }
        }
    }

    pub async fn fetch_published(&self) -> Result<Vec<String>, CompareFetchError> {
        self.source.fetch_published().await
    }
}
