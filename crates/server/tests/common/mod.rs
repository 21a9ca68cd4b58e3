//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use identity_core::AppState;
use identity_core::config::{
    AppConfig, FederationConfig, PasswordConfig, RegistrationConfig, SessionConfig,
};
use identity_core::directory::{MemoryDirectory, UserDirectory};
use identity_core::entity::{Role, user::NewUser};
use identity_core::oauth::{
    AccessToken, OAuthError, OAuthProviderClient, Provider, ProviderProfile, ProviderRegistry,
};
use std::sync::Arc;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        listen_addr: "127.0.0.1:0".into(),
        session: SessionConfig {
            secret: SECRET.into(),
            header: "x-token".into(),
        },
        // Cheap work factor so the suite stays fast.
        password: PasswordConfig {
            min_length: 8,
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        registration: RegistrationConfig { auto_verify: true },
        federation: FederationConfig::default(),
    }
}

/// Provider double returning a canned profile for any code except `"bad"`.
pub struct StubProvider {
    pub provider: Provider,
    pub email: Option<String>,
    pub full_name: String,
}

impl StubProvider {
    pub fn new(provider: Provider, email: Option<&str>, full_name: &str) -> Arc<Self> {
        Arc::new(Self {
            provider,
            email: email.map(str::to_string),
            full_name: full_name.into(),
        })
    }
}

#[async_trait]
impl OAuthProviderClient for StubProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn profile_includes_email(&self) -> bool {
        self.provider == Provider::Google
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("https://{}.test/authorize?state={state}", self.provider)
    }

    async fn exchange_code(&self, code: &str) -> Result<AccessToken, OAuthError> {
        if code == "bad" {
            return Err(OAuthError::Rejected("bad_verification_code".into()));
        }
        Ok(AccessToken::new("stub-token"))
    }

    async fn fetch_profile(&self, _token: &AccessToken) -> Result<ProviderProfile, OAuthError> {
        let (first_name, last_name) = identity_core::oauth::split_full_name(&self.full_name);
        Ok(ProviderProfile {
            email: if self.profile_includes_email() {
                self.email.clone()
            } else {
                None
            },
            first_name,
            last_name,
        })
    }

    async fn fetch_primary_email(&self, _token: &AccessToken) -> Result<Option<String>, OAuthError> {
        Ok(self.email.clone())
    }
}

pub fn build_state(
    config: &AppConfig,
    directory: Arc<MemoryDirectory>,
    providers: ProviderRegistry,
) -> AppState {
    AppState::new(config, directory, providers).expect("build app state")
}

pub async fn seed_user(
    directory: &MemoryDirectory,
    email: &str,
    role: Role,
    provider: Option<&str>,
) -> identity_core::entity::user::Model {
    directory
        .create(NewUser {
            first_name: "Seed".into(),
            last_name: "User".into(),
            email: email.into(),
            password_hash: None,
            role,
            verified: true,
            provider: provider.map(str::to_string),
        })
        .await
        .expect("seed user")
}
