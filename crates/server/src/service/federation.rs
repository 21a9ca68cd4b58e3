//! Federated login: reconciles a provider-asserted email with the local
//! user directory.
//!
//! A callback moves through code check, token exchange, profile fetch and
//! account resolution, ending either with a session token or a rejection.
//! The email is the only key shared between local and federated identities.
//! An account bound to one provider is never handed to another.

use std::sync::Arc;

use crate::directory::{DirectoryError, UserDirectory};
use crate::entity::{Role, user::Model as User, user::NewUser};
use crate::error::AuthError;
use crate::oauth::{OAuthProviderClient, Provider, ProviderProfile, ProviderRegistry};
use crate::service::UserSummary;
use crate::token::TokenCodec;
use crate::validation::{normalize_email, validate_email};

/// Successful federated login.
#[derive(Debug, Clone)]
pub struct FederatedLogin {
    pub token: String,
    pub user: UserSummary,
    /// Whether this login created the account.
    pub created: bool,
}

#[derive(Clone)]
pub struct FederationReconciler {
    directory: Arc<dyn UserDirectory>,
    codec: TokenCodec,
    providers: ProviderRegistry,
    link_local_accounts: bool,
}

impl FederationReconciler {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        codec: TokenCodec,
        providers: ProviderRegistry,
        link_local_accounts: bool,
    ) -> Self {
        Self {
            directory,
            codec,
            providers,
            link_local_accounts,
        }
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.providers.providers()
    }

    fn client(&self, provider: Provider) -> Result<Arc<dyn OAuthProviderClient>, AuthError> {
        self.providers
            .get(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))
    }

    /// Consent-screen URL for `provider`, with `from` round-tripped as the
    /// OAuth `state`. An empty `from` becomes `/`.
    pub fn authorization_url(
        &self,
        provider: Provider,
        from: Option<&str>,
    ) -> Result<String, AuthError> {
        let from = from.filter(|f| !f.is_empty()).unwrap_or("/");
        Ok(self.client(provider)?.authorization_url(from))
    }

    /// Handle a provider callback.
    #[tracing::instrument(skip_all, fields(provider = %provider))]
    pub async fn complete(
        &self,
        provider: Provider,
        code: Option<&str>,
    ) -> Result<FederatedLogin, AuthError> {
        let client = self.client(provider)?;

        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let access_token = client.exchange_code(code).await.map_err(|e| {
            tracing::warn!(
                name = "federation.exchange.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                provider = %provider,
                error = %e,
                message = "Authorization code exchange failed"
            );
            AuthError::UpstreamExchangeFailed(e.to_string())
        })?;

        let profile_failed = |e: crate::oauth::OAuthError| {
            tracing::warn!(
                name = "federation.profile.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                provider = %provider,
                error = %e,
                message = "Fetching provider profile failed"
            );
            AuthError::UpstreamProfileFailed(e.to_string())
        };

        let mut profile = client
            .fetch_profile(&access_token)
            .await
            .map_err(profile_failed)?;
        if !client.profile_includes_email() {
            profile.email = client
                .fetch_primary_email(&access_token)
                .await
                .map_err(profile_failed)?;
        }

        let email = usable_email(&profile).ok_or(AuthError::EmailUnavailable)?;
        let (user, created) = self.resolve_account(provider, email, profile).await?;

        let token = self.codec.issue(&user)?;
        tracing::info!(user_id = user.id, created, "federated login succeeded");
        Ok(FederatedLogin {
            token,
            user: UserSummary::from(&user),
            created,
        })
    }

    async fn resolve_account(
        &self,
        provider: Provider,
        email: String,
        profile: ProviderProfile,
    ) -> Result<(User, bool), AuthError> {
        match self.directory.get_by_email(&email).await {
            Ok(existing) => return Ok((self.reconcile(provider, existing).await?, false)),
            Err(DirectoryError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let new_user = NewUser {
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: email.clone(),
            password_hash: None,
            role: Role::Member,
            verified: true,
            provider: Some(provider.to_string()),
        };

        match self.directory.create(new_user).await {
            Ok(user) => Ok((user, true)),
            Err(DirectoryError::EmailExists) => {
                // Lost a create race for this email; use the winner's record.
                let existing = self
                    .directory
                    .get_by_email(&email)
                    .await
                    .map_err(storage_failure)?;
                Ok((self.reconcile(provider, existing).await?, false))
            }
            Err(e) => Err(storage_failure(e)),
        }
    }

    /// Decide whether `existing` may be used for a login through `provider`.
    async fn reconcile(&self, provider: Provider, existing: User) -> Result<User, AuthError> {
        match existing.provider.as_deref() {
            Some(bound) if bound == provider.as_str() => Ok(existing),
            Some(bound) => {
                tracing::info!(
                    name = "federation.provider_mismatch",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    user_id = existing.id,
                    bound,
                    attempted = %provider,
                    message = "Account is bound to another provider"
                );
                Err(AuthError::ProviderMismatch {
                    bound: bound.to_string(),
                })
            }
            None if !self.link_local_accounts => Err(AuthError::LocalAccountLinkDenied {
                provider: provider.to_string(),
            }),
            None => {
                let mut linked = existing;
                linked.provider = Some(provider.to_string());
                let linked = self
                    .directory
                    .update(linked)
                    .await
                    .map_err(storage_failure)?;
                tracing::info!(user_id = linked.id, provider = %provider, "linked local account");
                Ok(linked)
            }
        }
    }
}

fn usable_email(profile: &ProviderProfile) -> Option<String> {
    let email = normalize_email(profile.email.as_deref()?);
    validate_email(&email).ok()?;
    Some(email)
}

// The record was just seen or created, so a miss here is a storage fault
// rather than an authentication failure.
fn storage_failure(err: DirectoryError) -> AuthError {
    match err {
        DirectoryError::NotFound => {
            AuthError::Infrastructure("user record vanished during federation".to_string())
        }
        other => other.into(),
    }
}
