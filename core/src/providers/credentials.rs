//! Bearer tokens for the managed model client.
//!
//! The credential is resolved once when the client is built. Service-account
//! tokens are cached by `gcp_auth` and re-minted shortly before expiry, so a
//! long-running server keeps authenticating after the first hour.

use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use tracing::{debug, info};

use crate::config::ManagedCredential;
use crate::{DuetError, Result};

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Clone)]
pub enum BearerSource {
    Static(String),
    ServiceAccount(Arc<CustomServiceAccount>),
}

impl std::fmt::Debug for BearerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("BearerSource::Static(..)"),
            Self::ServiceAccount(_) => f.write_str("BearerSource::ServiceAccount(..)"),
        }
    }
}

impl BearerSource {
    pub fn resolve(credential: &ManagedCredential) -> Result<Self> {
        match credential {
            ManagedCredential::AccessToken(token) => Ok(Self::Static(token.clone())),
            ManagedCredential::ServiceAccountFile(path) => {
                let account = CustomServiceAccount::from_file(path).map_err(|e| {
                    DuetError::Configuration(format!(
                        "cannot load GOOGLE_APPLICATION_CREDENTIALS '{path}': {e}"
                    ))
                })?;
                info!(target: "model_prediction", path = %path, "Loaded service-account credentials");
                Ok(Self::ServiceAccount(Arc::new(account)))
            }
        }
    }

    pub async fn token(&self) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(account) => {
                let token = account
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(|e| DuetError::Credentials(e.to_string()))?;
                debug!(target: "model_prediction", "Fetched service-account token");
                Ok(token.as_str().to_string())
            }
        }
    }

    /// [`Self::token`] for code running on a `spawn_blocking` thread.
    pub fn token_blocking(&self) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(_) => {
                let handle = tokio::runtime::Handle::try_current().map_err(|e| {
                    DuetError::Credentials(format!("token refresh needs a tokio runtime: {e}"))
                })?;
                handle.block_on(self.token())
            }
        }
    }
}
