use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::CredentialProvider;
use crate::config::AuthConfig;
use crate::error::{Result, ScribeError};

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// OAuth client registration as downloaded from the Google Cloud Console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScribeError::CredentialsNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        let file: ClientSecretsFile = serde_json::from_str(&raw).map_err(|e| {
            ScribeError::Auth(format!("Invalid credentials file {}: {e}", path.display()))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            ScribeError::Auth(format!(
                "Credentials file {} has neither an \"installed\" nor a \"web\" client",
                path.display()
            ))
        })
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URI)
    }
}

/// The cached authorization persisted to `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - chrono::Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }

    /// Read a cached token. A missing or unreadable cache is not an error,
    /// it just means a new authorization is needed.
    pub fn load(path: &Path) -> Option<Self> {
        let raw = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_stored(self, previous_refresh: Option<String>, requested: &[String]) -> StoredToken {
        let scopes = match self.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => requested.to_vec(),
        };
        StoredToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            token_type: self.token_type,
            expires_at: self
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            scopes,
        }
    }
}

/// Obtains an authorization code from the user during the consent flow.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn authorization_code(&self, authorization_url: &Url) -> Result<String>;
}

/// Prints the consent URL and reads the code (or the full redirect URL) from
/// stdin.
#[derive(Debug, Clone)]
pub struct StdinPrompt {
    application_name: String,
}

impl StdinPrompt {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
        }
    }
}

/// Accept either a bare code or the URL the browser was redirected to.
fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, value)| value.into_owned()),
        Err(_) => Some(input.to_string()),
    }
}

#[async_trait]
impl AuthorizationPrompt for StdinPrompt {
    async fn authorization_code(&self, authorization_url: &Url) -> Result<String> {
        println!(
            "\n{} needs access to Google Drive.\nOpen this URL in a browser and approve access:\n\n  {}\n",
            self.application_name, authorization_url
        );
        print!("Paste the authorization code (or the URL you were redirected to): ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        extract_code(&line)
            .ok_or_else(|| ScribeError::Auth("No authorization code entered".to_string()))
    }
}

/// Installed-application OAuth with a file-backed token cache.
pub struct OAuthCredentialProvider {
    client: Client,
    config: AuthConfig,
    prompt: Arc<dyn AuthorizationPrompt>,
    current: Mutex<Option<StoredToken>>,
}

impl OAuthCredentialProvider {
    pub fn new(config: AuthConfig, prompt: Arc<dyn AuthorizationPrompt>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(config.application_name.clone())
            .build()
            .map_err(|e| ScribeError::Auth(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            prompt,
            current: Mutex::new(None),
        })
    }

    pub fn authorization_url(&self, secrets: &ClientSecrets) -> Result<Url> {
        let url = Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", secrets.redirect_uri()),
                ("response_type", "code"),
                ("scope", self.config.scopes.join(" ").as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )?;
        Ok(url)
    }

    async fn obtain(&self, cached: Option<StoredToken>) -> Result<StoredToken> {
        let cached = cached.or_else(|| StoredToken::load(&self.config.token_file));
        if let Some(token) = cached.as_ref().filter(|t| t.is_valid(Utc::now())) {
            debug!("Using cached token from {}", self.config.token_file.display());
            return Ok(token.clone());
        }

        let secrets = ClientSecrets::load(&self.config.credentials_file)?;

        if let Some(refresh_token) = cached.and_then(|t| t.refresh_token) {
            match self.refresh(&secrets, refresh_token).await {
                Ok(token) => {
                    token.save(&self.config.token_file)?;
                    debug!("Access token refreshed");
                    return Ok(token);
                }
                Err(e) => warn!("Token refresh failed, starting a new authorization: {}", e),
            }
        }

        let token = self.authorize(&secrets).await?;
        token.save(&self.config.token_file)?;
        info!(
            "Credentials stored to {}",
            self.config.token_file.display()
        );
        Ok(token)
    }

    async fn refresh(&self, secrets: &ClientSecrets, refresh_token: String) -> Result<StoredToken> {
        let response = self
            .request_token(
                secrets,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token.as_str()),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                ],
            )
            .await?;
        Ok(response.into_stored(Some(refresh_token), &self.config.scopes))
    }

    async fn authorize(&self, secrets: &ClientSecrets) -> Result<StoredToken> {
        let url = self.authorization_url(secrets)?;
        let code = self.prompt.authorization_code(&url).await?;
        let response = self
            .request_token(
                secrets,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code.as_str()),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("redirect_uri", secrets.redirect_uri()),
                ],
            )
            .await?;
        Ok(response.into_stored(None, &self.config.scopes))
    }

    async fn request_token(
        &self,
        secrets: &ClientSecrets,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        let response = self
            .client
            .post(&secrets.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| ScribeError::Auth(format!("Token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ScribeError::Auth(format!("Token response unreadable: {e}")))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(ScribeError::Auth(format!(
                "Token endpoint returned {status}: {detail}"
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ScribeError::Auth(format!("Malformed token response: {e}")))
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn access_token(&self) -> Result<String> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_valid(Utc::now())) {
            return Ok(token.access_token.clone());
        }

        let token = self.obtain(current.take()).await?;
        let access_token = token.access_token.clone();
        *current = Some(token);
        Ok(access_token)
    }
}
