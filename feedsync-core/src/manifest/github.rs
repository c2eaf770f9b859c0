use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::PublishSection;

use super::publisher::{DocumentStore, PublishError, StoreDiagnostics};

/// GitHub contents API as the version-controlled document store. The blob
/// SHA is the revision marker; writes are PUTs carrying base64 content and,
/// for updates, the SHA precondition.
pub struct GithubContentStore {
    client: Client,
    config: PublishSection,
    token: String,
    user_agent: String,
}

impl GithubContentStore {
    pub fn new(
        client: Client,
        config: PublishSection,
        token: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            config,
            token: token.into(),
            user_agent: user_agent.into(),
        }
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo
        )
    }

    fn contents_url(&self) -> String {
        format!("{}/contents/{}", self.repo_url(), self.config.file_path)
    }

    fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, &self.user_agent)
    }

    async fn fetch_repo(&self) -> Result<RepoResponse, PublishError> {
        let response = self.request(Method::GET, self.repo_url()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for GithubContentStore {
    async fn read_revision(&self) -> Result<Option<String>, PublishError> {
        let url = format!("{}?ref={}", self.contents_url(), self.config.branch);
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        if status.is_success() {
            let metadata: ContentMetadata = response.json().await?;
            return Ok(Some(metadata.sha));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        // Flaky metadata reads are tolerated: an update attempted without a
        // marker is rejected by the write call itself.
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            target: "publish",
            status = status.as_u16(),
            body = %body,
            "metadata read degraded, proceeding without revision"
        );
        Ok(None)
    }

    async fn write_document(
        &self,
        content_b64: &str,
        message: &str,
        revision: Option<&str>,
    ) -> Result<String, PublishError> {
        let payload = WriteRequest {
            message,
            content: content_b64,
            branch: &self.config.branch,
            sha: revision,
        };
        let response = self
            .request(Method::PUT, self.contents_url())
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let written: WriteResponse = response.json().await?;
        written
            .content
            .and_then(|content| content.sha)
            .ok_or(PublishError::MissingRevision)
    }

    async fn diagnostics(&self) -> StoreDiagnostics {
        let (repo_reachable, write_access) = match self.fetch_repo().await {
            Ok(repo) => (
                true,
                repo.permissions.map(|p| p.push).unwrap_or(false),
            ),
            Err(err) => {
                tracing::warn!(target: "publish", error = %err, "repository metadata unavailable");
                (false, false)
            }
        };
        let (document_exists, revision) = match self.read_revision().await {
            Ok(Some(marker)) => (true, Some(marker)),
            Ok(None) => (false, None),
            Err(err) => {
                tracing::warn!(target: "publish", error = %err, "document metadata unavailable");
                (false, None)
            }
        };
        StoreDiagnostics {
            repo_reachable,
            write_access,
            document_exists,
            revision,
        }
    }
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ContentMetadata {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    content: Option<WrittenContent>,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    #[serde(default)]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    #[serde(default)]
    permissions: Option<RepoPermissions>,
}

#[derive(Debug, Deserialize)]
struct RepoPermissions {
    #[serde(default)]
    push: bool,
}
