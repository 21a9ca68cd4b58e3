//! OAuth2 identity provider clients.
//!
//! Each provider implements [`OAuthProviderClient`]. The flow is the same
//! authorization-code exchange for both; they differ only in how the profile
//! is read. Google returns the email in its userinfo payload, GitHub omits it
//! and exposes it through a separate emails endpoint, which shows up here as
//! `profile_includes_email() == false` plus [`OAuthProviderClient::fetch_primary_email`].

mod github;
mod google;
mod http;

pub use github::GithubClient;
pub use google::GoogleClient;
pub use http::{Endpoints, OAuthHttp};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::FederationConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::Github];

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
        }
    }

    /// Human-readable name for messages.
    pub fn label(self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::Github => "GitHub",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "github" => Ok(Provider::Github),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid provider configuration: {0}")]
    Config(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("HTTP status {status}: {context}")]
    Status { status: u16, context: String },
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Provider rejected the request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OAuthError::Decode(err.to_string())
        } else {
            OAuthError::Request(err.to_string())
        }
    }
}

/// Provider access token. Never logged.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Profile data asserted by a provider for one login.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderProfile {
    /// `None` when the provider did not supply a verified address.
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Split a single full-name field: first whitespace-delimited token is the
/// first name, the rest (possibly empty) is the last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether [`fetch_profile`](Self::fetch_profile) carries the email.
    fn profile_includes_email(&self) -> bool;

    /// Consent-screen URL carrying `state` as an opaque round-trip value.
    fn authorization_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<AccessToken, OAuthError>;

    async fn fetch_profile(&self, token: &AccessToken) -> Result<ProviderProfile, OAuthError>;

    /// Primary email for providers whose profile omits it.
    async fn fetch_primary_email(&self, _token: &AccessToken) -> Result<Option<String>, OAuthError> {
        Ok(None)
    }
}

/// Configured provider clients keyed by provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<Provider, Arc<dyn OAuthProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build clients for every provider present in the configuration.
    pub fn from_config(config: &FederationConfig) -> Result<Self, OAuthError> {
        let mut registry = Self::new();
        let timeout = config.http_timeout();
        if let Some(google) = &config.google {
            registry.insert(Arc::new(GoogleClient::new(google, timeout)?));
        }
        if let Some(github) = &config.github {
            registry.insert(Arc::new(GithubClient::new(github, timeout)?));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, client: Arc<dyn OAuthProviderClient>) {
        self.clients.insert(client.provider(), client);
    }

    pub fn with(mut self, client: Arc<dyn OAuthProviderClient>) -> Self {
        self.insert(client);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn OAuthProviderClient>> {
        self.clients.get(&provider).cloned()
    }

    pub fn providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.clients.contains_key(p))
            .collect()
    }
}
