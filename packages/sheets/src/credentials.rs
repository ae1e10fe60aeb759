//! Bearer token providers for the Google REST clients.
//!
//! Two sources are supported: a static bearer token, and a
//! cached authorized-user token file that is refreshed in place when it
//! has expired. Obtaining an interactive OAuth consent is out of scope; a
//! missing or unusable token is a setup error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Default OAuth token endpoint used when the token file does not name
/// one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed early.
const EXPIRY_MARGIN: TimeDelta = TimeDelta::seconds(60);

/// Errors obtaining credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No credential source is configured.
    #[error("Missing credentials: {message}")]
    Missing {
        /// What is missing.
        message: String,
    },

    /// The token has expired and cannot be refreshed.
    #[error("Token expired and no refresh token is available")]
    Expired,

    /// The token endpoint rejected the refresh.
    #[error("Token refresh failed: {message}")]
    Refresh {
        /// Server-provided detail.
        message: String,
    },

    /// Token file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Token file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request to the token endpoint failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Supplies a bearer token for each outgoing request.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a currently valid access token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if no valid token can be produced.
    async fn access_token(&self) -> Result<String, CredentialError>;
}

/// A fixed token, typically from `GOOGLE_ACCESS_TOKEN`.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Wraps an already obtained token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Contents of an authorized-user token file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthorizedUser {
    #[serde(alias = "access_token")]
    token: Option<String>,
    refresh_token: Option<String>,
    token_uri: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scopes: Vec<String>,
}

impl AuthorizedUser {
    fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref()?;
        match self.expiry {
            Some(expiry) if expiry - EXPIRY_MARGIN <= now => None,
            _ => Some(token),
        }
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// A cached authorized-user token file, refreshed and rewritten on expiry.
pub struct AuthorizedUserFile {
    path: PathBuf,
    client: reqwest::Client,
    cached: Mutex<Option<AuthorizedUser>>,
}

impl AuthorizedUserFile {
    /// Creates a provider backed by the token file at `path`. The file is
    /// read lazily on first use.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            client: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    async fn load(&self) -> Result<AuthorizedUser, CredentialError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<(), CredentialError> {
        let (Some(refresh_token), Some(client_id), Some(client_secret)) = (
            user.refresh_token.as_deref(),
            user.client_id.as_deref(),
            user.client_secret.as_deref(),
        ) else {
            return Err(CredentialError::Expired);
        };

        let token_uri = user.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        log::info!("Refreshing access token via {token_uri}");

        let resp = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CredentialError::Refresh {
                message: format!("{status}: {body}"),
            });
        }

        let refreshed: RefreshResponse = resp.json().await?;
        user.token = Some(refreshed.access_token);
        user.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + TimeDelta::seconds(secs));

        match serde_json::to_vec_pretty(&*user) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&self.path, bytes).await {
                    log::warn!(
                        "Failed to save refreshed token to {}: {e}",
                        self.path.display()
                    );
                }
            }
            Err(e) => log::warn!("Failed to serialize refreshed token: {e}"),
        }

        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for AuthorizedUserFile {
    async fn access_token(&self) -> Result<String, CredentialError> {
        let mut cached = self.cached.lock().await;
        let mut user = match cached.take() {
            Some(user) => user,
            None => self.load().await?,
        };

        if user.valid_token(Utc::now()).is_none() {
            self.refresh(&mut user).await?;
        }

        let token = user
            .valid_token(Utc::now())
            .map(str::to_string)
            .ok_or(CredentialError::Expired);
        *cached = Some(user);
        token
    }
}

/// Picks a provider: a non-blank `access_token` wins over `token_file`.
///
/// # Errors
///
/// Returns [`CredentialError::Missing`] if neither is given.
pub fn resolve(
    access_token: Option<&str>,
    token_file: Option<&Path>,
) -> Result<Arc<dyn CredentialProvider>, CredentialError> {
    if let Some(token) = access_token.map(str::trim)
        && !token.is_empty()
    {
        return Ok(Arc::new(StaticToken::new(token.to_string())));
    }
    if let Some(path) = token_file
        && !path.as_os_str().is_empty()
    {
        return Ok(Arc::new(AuthorizedUserFile::new(path)));
    }
    Err(CredentialError::Missing {
        message: "set GOOGLE_ACCESS_TOKEN or GOOGLE_TOKEN_FILE".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(expiry: Option<DateTime<Utc>>) -> AuthorizedUser {
        AuthorizedUser {
            token: Some("abc".to_string()),
            refresh_token: None,
            token_uri: None,
            client_id: None,
            client_secret: None,
            expiry,
            scopes: Vec::new(),
        }
    }

    #[test]
    fn token_without_expiry_is_valid() {
        assert_eq!(user(None).valid_token(Utc::now()), Some("abc"));
    }

    #[test]
    fn token_near_expiry_is_invalid() {
        let now = Utc::now();
        assert!(
            user(Some(now + TimeDelta::seconds(30)))
                .valid_token(now)
                .is_none()
        );
        assert!(
            user(Some(now + TimeDelta::minutes(30)))
                .valid_token(now)
                .is_some()
        );
    }

    #[test]
    fn parses_access_token_alias() {
        let parsed: AuthorizedUser =
            serde_json::from_str(r#"{"access_token": "xyz", "refresh_token": "r"}"#).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn expired_file_without_refresh_token_fails() {
        let path = std::env::temp_dir().join(format!("risk_map_token_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"token": "old", "expiry": "2000-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let provider = AuthorizedUserFile::new(&path);
        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, CredentialError::Expired));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn static_token_is_returned() {
        let provider = StaticToken::new("tok".to_string());
        assert_eq!(provider.access_token().await.unwrap(), "tok");
    }

    #[tokio::test]
    async fn resolve_prefers_access_token() {
        let provider = resolve(Some(" tok "), Some(Path::new("/nonexistent.json"))).unwrap();
        assert_eq!(provider.access_token().await.unwrap(), "tok");
    }

    #[test]
    fn resolve_without_inputs_is_missing() {
        let err = resolve(Some("  "), None).err().unwrap();
        assert!(matches!(err, CredentialError::Missing { .. }));
    }
}
