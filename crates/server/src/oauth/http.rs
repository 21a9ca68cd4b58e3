//! Shared authorization-code plumbing used by every provider client.

use reqwest::{Client, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::{AccessToken, OAuthError};
use crate::config::ProviderConfig;

/// Resolved endpoints and credentials for one provider.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: Url,
    pub token_url: Url,
    pub profile_url: Url,
    pub emails_url: Option<Url>,
    pub scopes: &'static [&'static str],
}

/// Built-in endpoints for a provider, overridable from configuration.
pub(super) struct Defaults {
    pub auth_url: &'static str,
    pub token_url: &'static str,
    pub profile_url: &'static str,
    pub emails_url: Option<&'static str>,
    pub scopes: &'static [&'static str],
}

fn parse_url(kind: &str, raw: &str) -> Result<Url, OAuthError> {
    Url::parse(raw).map_err(|e| OAuthError::Config(format!("invalid {kind} '{raw}': {e}")))
}

impl Endpoints {
    pub(super) fn resolve(config: &ProviderConfig, defaults: &Defaults) -> Result<Self, OAuthError> {
        let emails_url = match config.emails_url.as_deref().or(defaults.emails_url) {
            Some(raw) => Some(parse_url("emails_url", raw)?),
            None => None,
        };
        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            auth_url: parse_url(
                "auth_url",
                config.auth_url.as_deref().unwrap_or(defaults.auth_url),
            )?,
            token_url: parse_url(
                "token_url",
                config.token_url.as_deref().unwrap_or(defaults.token_url),
            )?,
            profile_url: parse_url(
                "profile_url",
                config.profile_url.as_deref().unwrap_or(defaults.profile_url),
            )?,
            emails_url,
            scopes: defaults.scopes,
        })
    }
}

/// Token endpoint reply. GitHub reports failures as `200` with an `error`
/// field, so both shapes are accepted here.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// HTTP client bound to one provider's endpoints. All requests share the
/// configured timeout.
#[derive(Debug, Clone)]
pub struct OAuthHttp {
    http: Client,
    endpoints: Endpoints,
}

impl OAuthHttp {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, OAuthError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OAuthError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn authorization_url(&self, state: &str) -> String {
        let mut url = self.endpoints.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.endpoints.client_id)
            .append_pair("redirect_uri", &self.endpoints.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.endpoints.scopes.join(" "))
            .append_pair("state", state);
        url.to_string()
    }

    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.endpoints.redirect_url.as_str()),
            ("client_id", self.endpoints.client_id.as_str()),
            ("client_secret", self.endpoints.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.endpoints.token_url.clone())
            .header(header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Status {
                status: status.as_u16(),
                context: body,
            });
        }

        let token: TokenResponse = response.json().await?;
        match (token.access_token, token.error) {
            (_, Some(error)) => Err(OAuthError::Rejected(match token.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error,
            })),
            (Some(access_token), None) if !access_token.is_empty() => {
                Ok(AccessToken::new(access_token))
            }
            _ => Err(OAuthError::Decode(
                "token response carried no access_token".to_string(),
            )),
        }
    }

    /// Authenticated GET returning a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        token: &AccessToken,
    ) -> Result<T, OAuthError> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token.secret())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Status {
                status: status.as_u16(),
                context: body,
            });
        }

        Ok(response.json().await?)
    }
}
