//! GitHub OAuth2 client.
//!
//! `/user` may return `email: null` depending on the account's privacy
//! settings, so the address always comes from `/user/emails`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::http::{Defaults, Endpoints, OAuthHttp};
use super::{
    AccessToken, OAuthError, OAuthProviderClient, Provider, ProviderProfile, split_full_name,
};
use crate::config::ProviderConfig;

const DEFAULTS: Defaults = Defaults {
    auth_url: "https://github.com/login/oauth/authorize",
    token_url: "https://github.com/login/oauth/access_token",
    profile_url: "https://api.github.com/user",
    emails_url: Some("https://api.github.com/user/emails"),
    scopes: &["read:user", "user:email"],
};

#[derive(Debug, Deserialize)]
struct GithubUser {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

pub struct GithubClient {
    http: OAuthHttp,
}

impl GithubClient {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, OAuthError> {
        let endpoints = Endpoints::resolve(config, &DEFAULTS)?;
        Ok(Self {
            http: OAuthHttp::new(endpoints, timeout)?,
        })
    }
}

/// The primary address, provided GitHub has verified it.
fn primary_email(emails: Vec<GithubEmail>) -> Option<String> {
    emails
        .into_iter()
        .find(|e| e.primary)
        .filter(|e| e.verified)
        .map(|e| e.email)
}

#[async_trait]
impl OAuthProviderClient for GithubClient {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    fn profile_includes_email(&self) -> bool {
        false
    }

    fn authorization_url(&self, state: &str) -> String {
        self.http.authorization_url(state)
    }

    #[tracing::instrument(skip_all, fields(provider = "github"))]
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, OAuthError> {
        self.http.exchange_code(code).await
    }

    #[tracing::instrument(skip_all, fields(provider = "github"))]
    async fn fetch_profile(&self, token: &AccessToken) -> Result<ProviderProfile, OAuthError> {
        let user: GithubUser = self
            .http
            .get_json(&self.http.endpoints().profile_url, token)
            .await?;
        let (first_name, last_name) = split_full_name(user.name.as_deref().unwrap_or_default());
        Ok(ProviderProfile {
            email: None,
            first_name,
            last_name,
        })
    }

    #[tracing::instrument(skip_all, fields(provider = "github"))]
    async fn fetch_primary_email(&self, token: &AccessToken) -> Result<Option<String>, OAuthError> {
        let Some(url) = &self.http.endpoints().emails_url else {
            return Ok(None);
        };
        let emails: Vec<GithubEmail> = self.http.get_json(url, token).await?;
        Ok(primary_email(emails))
    }
}
