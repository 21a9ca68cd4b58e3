//! Identity and session core for a web service.
//!
//! Authenticates users by password or through Google and GitHub OAuth2,
//! issues and verifies signed session tokens, and gates routes by role.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::directory::UserDirectory;
use crate::error::AuthError;
use crate::guard::AccessGuard;
use crate::oauth::ProviderRegistry;
use crate::service::{AuthenticationService, FederationReconciler};
use crate::token::TokenCodec;

pub mod api;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod guard;
pub mod oauth;
pub mod password;
pub mod service;
pub mod token;
pub mod validation;

/// Shared handler state. Everything in here is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthenticationService,
    pub federation: FederationReconciler,
    pub guard: AccessGuard,
    pub directory: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Wire the services around one directory and one provider registry.
    pub fn new(
        config: &AppConfig,
        directory: Arc<dyn UserDirectory>,
        providers: ProviderRegistry,
    ) -> Result<Self, AuthError> {
        let codec = TokenCodec::new(config.session.secret.as_bytes());
        Ok(Self {
            auth: AuthenticationService::from_config(directory.clone(), codec.clone(), config)?,
            federation: FederationReconciler::new(
                directory.clone(),
                codec.clone(),
                providers,
                config.federation.link_local_accounts,
            ),
            guard: AccessGuard::new(directory.clone(), codec, &config.session.header)?,
            directory,
        })
    }
}
