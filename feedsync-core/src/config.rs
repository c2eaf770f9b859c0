use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

const APP_KEY_VAR: &str = "DROPBOX_APP_KEY";
const APP_SECRET_VAR: &str = "DROPBOX_APP_SECRET";
const REFRESH_TOKEN_VAR: &str = "DROPBOX_REFRESH_TOKEN";
const PUBLISH_TOKEN_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FeedsyncConfig {
    pub storage: StorageSection,
    pub publish: PublishSection,
    pub sync: SyncSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    pub api_base: String,
    pub token_endpoint: String,
    pub root_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishSection {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub file_path: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    pub interval_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub bind: String,
}

pub fn load_feedsync_config<P: AsRef<Path>>(path: P) -> Result<FeedsyncConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// Secrets for the object store and the document store. Read once from the
/// environment before any network call; access tokens derived from these are
/// fetched fresh every cycle and never persisted.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
    pub publish_token: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_key: require(APP_KEY_VAR)?,
            app_secret: require(APP_SECRET_VAR)?,
            refresh_token: require(REFRESH_TOKEN_VAR)?,
            publish_token: require(PUBLISH_TOKEN_VAR)?,
        })
    }
}

fn require(name: &'static str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// Presence report for the diagnostic surface. Values are booleans only;
/// secret material never leaves the process.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialPresence {
    pub dropbox_app_key: bool,
    pub dropbox_app_secret: bool,
    pub dropbox_refresh_token: bool,
    pub github_token: bool,
}

pub fn credential_presence() -> CredentialPresence {
    CredentialPresence {
        dropbox_app_key: is_set(APP_KEY_VAR),
        dropbox_app_secret: is_set(APP_SECRET_VAR),
        dropbox_refresh_token: is_set(REFRESH_TOKEN_VAR),
        github_token: is_set(PUBLISH_TOKEN_VAR),
    }
}

fn is_set(name: &str) -> bool {
    std::env::var(name)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}
