//! Google OAuth2 / OpenID Connect userinfo client.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::http::{Defaults, Endpoints, OAuthHttp};
use super::{
    AccessToken, OAuthError, OAuthProviderClient, Provider, ProviderProfile, split_full_name,
};
use crate::config::ProviderConfig;

const DEFAULTS: Defaults = Defaults {
    auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    profile_url: "https://www.googleapis.com/oauth2/v3/userinfo",
    emails_url: None,
    scopes: &["openid", "email", "profile"],
};

/// Google userinfo response.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    email_verified: Option<bool>,
    given_name: Option<String>,
    family_name: Option<String>,
    name: Option<String>,
}

pub struct GoogleClient {
    http: OAuthHttp,
}

impl GoogleClient {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> Result<Self, OAuthError> {
        let endpoints = Endpoints::resolve(config, &DEFAULTS)?;
        Ok(Self {
            http: OAuthHttp::new(endpoints, timeout)?,
        })
    }
}

impl GoogleUserInfo {
    fn into_profile(self) -> ProviderProfile {
        let email = match self.email_verified {
            Some(false) => None,
            _ => self.email.filter(|e| !e.trim().is_empty()),
        };
        let (first_name, last_name) = match (self.given_name, self.family_name) {
            (Some(given), family) => (given, family.unwrap_or_default()),
            (None, _) => split_full_name(self.name.as_deref().unwrap_or_default()),
        };
        ProviderProfile {
            email,
            first_name,
            last_name,
        }
    }
}

#[async_trait]
impl OAuthProviderClient for GoogleClient {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn profile_includes_email(&self) -> bool {
        true
    }

    fn authorization_url(&self, state: &str) -> String {
        self.http.authorization_url(state)
    }

    #[tracing::instrument(skip_all, fields(provider = "google"))]
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, OAuthError> {
        self.http.exchange_code(code).await
    }

    #[tracing::instrument(skip_all, fields(provider = "google"))]
    async fn fetch_profile(&self, token: &AccessToken) -> Result<ProviderProfile, OAuthError> {
        let info: GoogleUserInfo = self
            .http
            .get_json(&self.http.endpoints().profile_url, token)
            .await?;
        Ok(info.into_profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(json: serde_json::Value) -> ProviderProfile {
        serde_json::from_value::<GoogleUserInfo>(json)
            .unwrap()
            .into_profile()
    }

    #[test]
    fn structured_names_are_used_directly() {
        let profile = info(serde_json::json!({
            "sub": "1",
            "email": "ada@example.com",
            "email_verified": true,
            "given_name": "Ada",
            "family_name": "King Lovelace",
            "name": "Ada King Lovelace"
        }));
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.last_name, "King Lovelace");
    }

    #[test]
    fn falls_back_to_full_name() {
        let profile = info(serde_json::json!({
            "email": "grace@example.com",
            "name": "Grace Hopper"
        }));
        assert_eq!(profile.first_name, "Grace");
        assert_eq!(profile.last_name, "Hopper");
    }

    #[test]
    fn unverified_email_is_dropped() {
        let profile = info(serde_json::json!({
            "email": "mallory@example.com",
            "email_verified": false,
            "given_name": "Mallory"
        }));
        assert!(profile.email.is_none());
    }

    #[test]
    fn missing_email_is_none() {
        let profile = info(serde_json::json!({ "given_name": "Nobody" }));
        assert!(profile.email.is_none());
        assert_eq!(profile.last_name, "");
    }
}
