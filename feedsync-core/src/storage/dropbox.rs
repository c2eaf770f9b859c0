use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{CreatedLink, FolderEntry, LinkResolutionError, ListError, ObjectStore};

/// Dropbox HTTP API v2 client: folder listing plus shared-link lookup and
/// creation, all bearer-auth JSON POST endpoints.
pub struct DropboxStore {
    client: Client,
    api_base: String,
}

impl DropboxStore {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), suffix)
    }

    async fn call_list(
        &self,
        url: String,
        body: serde_json::Value,
        token: &str,
    ) -> Result<ListFolderResponse, ListError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ListError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ObjectStore for DropboxStore {
    async fn list_folder(
        &self,
        root_path: &str,
        token: &str,
    ) -> Result<Vec<FolderEntry>, ListError> {
        // the API spells the root folder as the empty string
        let root = if root_path == "/" { "" } else { root_path };
        let mut response = self
            .call_list(
                self.endpoint("files/list_folder"),
                serde_json::json!({ "path": root, "recursive": false }),
                token,
            )
            .await?;
        let mut entries = convert_entries(response.entries);
        while response.has_more {
            response = self
                .call_list(
                    self.endpoint("files/list_folder/continue"),
                    serde_json::json!({ "cursor": response.cursor }),
                    token,
                )
                .await?;
            entries.extend(convert_entries(response.entries));
        }
        Ok(entries)
    }

    async fn shared_links(
        &self,
        path: &str,
        token: &str,
    ) -> Result<Vec<String>, LinkResolutionError> {
        let response = self
            .client
            .post(self.endpoint("sharing/list_shared_links"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": path, "direct_only": true }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LinkResolutionError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }
        let parsed: SharedLinksResponse = response.json().await?;
        Ok(parsed.links.into_iter().map(|link| link.url).collect())
    }

    async fn create_shared_link(
        &self,
        path: &str,
        token: &str,
    ) -> Result<CreatedLink, LinkResolutionError> {
        let response = self
            .client
            .post(self.endpoint("sharing/create_shared_link_with_settings"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "path": path }))
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 409 {
            let body = response.text().await.unwrap_or_default();
            if body.contains("shared_link_already_exists") {
                return Ok(CreatedLink::AlreadyExists);
            }
            return Err(LinkResolutionError::Status {
                status: 409,
                path: path.to_string(),
                body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LinkResolutionError::Status {
                status: status.as_u16(),
                path: path.to_string(),
                body,
            });
        }
        let parsed: CreatedLinkResponse = response.json().await?;
        Ok(CreatedLink::Created(parsed.url))
    }
}

fn convert_entries(entries: Vec<RawFolderEntry>) -> Vec<FolderEntry> {
    entries
        .into_iter()
        .filter_map(|raw| {
            let path = raw.path_lower.or(raw.path_display)?;
            Some(FolderEntry {
                path,
                is_file: raw.tag == "file",
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<RawFolderEntry>,
    #[serde(default)]
    cursor: String,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct RawFolderEntry {
    #[serde(rename = ".tag")]
    tag: String,
    #[serde(default)]
    path_lower: Option<String>,
    #[serde(default)]
    path_display: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SharedLinksResponse {
    links: Vec<SharedLinkEntry>,
}

#[derive(Debug, Deserialize)]
struct SharedLinkEntry {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CreatedLinkResponse {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_folder_listing() {
        let response: ListFolderResponse = serde_json::from_str(
            r#"{
                "entries": [
                    {".tag": "file", "name": "a.m3u8", "path_lower": "/hls/a.m3u8", "path_display": "/hls/a.m3u8"},
                    {".tag": "folder", "name": "segments", "path_lower": "/hls/segments"}
                ],
                "cursor": "AAA",
                "has_more": true
            }"#,
        )
        .unwrap();
        assert!(response.has_more);
        let entries = convert_entries(response.entries);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_file);
        assert!(!entries[1].is_file);
        assert_eq!(entries[0].path, "/hls/a.m3u8");
    }

    #[test]
    fn parses_shared_link_listing() {
        let response: SharedLinksResponse = serde_json::from_str(
            r#"{"links": [{"url": "https://www.dropbox.com/s/abc/a.m3u8?dl=0", ".tag": "file"}]}"#,
        )
        .unwrap();
        assert_eq!(response.links.len(), 1);
        assert!(response.links[0].url.ends_with("dl=0"));
    }
}
