use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Credentials;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Short-lived access credential. Derived fresh every reconciliation cycle;
/// never cached across invocations.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn obtain_access_token(&self) -> Result<AccessToken, AuthError>;
}

/// Exchanges the long-lived refresh token for an access token against the
/// provider's OAuth2 endpoint. No retry here: a failed exchange fails the
/// cycle and the next scheduled tick starts over.
pub struct DropboxTokenProvider {
    client: Client,
    token_endpoint: String,
    credentials: Credentials,
}

impl DropboxTokenProvider {
    pub fn new(
        client: Client,
        token_endpoint: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            token_endpoint: token_endpoint.into(),
            credentials,
        }
    }
}

#[async_trait]
impl TokenSource for DropboxTokenProvider {
    async fn obtain_access_token(&self) -> Result<AccessToken, AuthError> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .basic_auth(&self.credentials.app_key, Some(&self.credentials.app_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            secret: token.access_token,
            expires_in: token.expires_in,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_endpoint_response() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token": "sl.abc123", "token_type": "bearer", "expires_in": 14400}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "sl.abc123");
        assert_eq!(token.expires_in, Some(14400));
    }

    #[test]
    fn expiry_is_optional() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "sl.abc123"}"#).unwrap();
        assert_eq!(token.expires_in, None);
    }
}
