//! Bearer credentials for the Drive API.
//!
//! The Drive client never reads tokens from disk itself; it is handed a
//! `CredentialProvider`. The binary uses `OAuthCredentialProvider` (cached
//! `token.json` plus the installed-app consent flow), tests use
//! `StaticTokenProvider`.

mod oauth;

pub use oauth::{
    AuthorizationPrompt, ClientSecrets, OAuthCredentialProvider, StdinPrompt, StoredToken,
};

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A currently valid bearer token.
    async fn access_token(&self) -> Result<String>;

    /// Make sure credentials are usable before any work starts.
    async fn authenticate(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
