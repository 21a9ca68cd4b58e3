//! Password login and registration.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::directory::{DirectoryError, UserDirectory};
use crate::entity::{Role, user::NewUser};
use crate::error::AuthError;
use crate::password::PasswordHasher;
use crate::token::TokenCodec;
use crate::validation::{LoginInput, RegisterInput, normalize_email};

#[derive(Clone)]
pub struct AuthenticationService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<PasswordHasher>,
    codec: TokenCodec,
    min_password_length: usize,
    auto_verify: bool,
}

impl AuthenticationService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<PasswordHasher>,
        codec: TokenCodec,
        min_password_length: usize,
        auto_verify: bool,
    ) -> Self {
        Self {
            directory,
            hasher,
            codec,
            min_password_length,
            auto_verify,
        }
    }

    pub fn from_config(
        directory: Arc<dyn UserDirectory>,
        codec: TokenCodec,
        config: &AppConfig,
    ) -> Result<Self, AuthError> {
        Ok(Self::new(
            directory,
            Arc::new(PasswordHasher::from_config(&config.password)?),
            codec,
            config.password.min_length,
            config.registration.auto_verify,
        ))
    }

    /// Check a password login and issue a session token.
    ///
    /// Unknown email, wrong password and accounts without a password hash all
    /// fail with the same [`AuthError::InvalidCredentials`].
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, input: LoginInput) -> Result<String, AuthError> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let user = match self.directory.get_by_email(&email).await {
            Ok(user) => user,
            Err(DirectoryError::NotFound) => {
                self.burn_verification(input.password).await?;
                tracing::info!(
                    name = "auth.login.rejected",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    message = "Login rejected"
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let matched = match user.password_hash.clone() {
            Some(hash) => self.check_password(hash, input.password).await?,
            None => {
                self.burn_verification(input.password).await?;
                false
            }
        };
        if !matched {
            tracing::info!(
                name = "auth.login.rejected",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                message = "Login rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        if !user.verified {
            return Err(AuthError::Unverified);
        }

        tracing::info!(user_id = user.id, "password login succeeded");
        self.codec.issue(&user)
    }

    /// Create a local account. Returns the confirmation message.
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, input: RegisterInput) -> Result<String, AuthError> {
        let input = input.validate(self.min_password_length)?;
        let hash = self.hash_password(input.password).await?;

        let new_user = NewUser {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            password_hash: Some(hash),
            role: Role::Member,
            verified: self.auto_verify,
            provider: None,
        };

        match self.directory.create(new_user).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "user registered");
                Ok(format!("User {} registered successfully", user.email))
            }
            Err(DirectoryError::EmailExists) => Err(AuthError::EmailExists),
            Err(e) => Err(e.into()),
        }
    }

    // Argon2 is CPU bound; keep it off the async workers.
    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    async fn check_password(&self, hash: String, password: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    async fn burn_verification(&self, password: String) -> Result<(), AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service(directory: Arc<MemoryDirectory>, auto_verify: bool) -> AuthenticationService {
        AuthenticationService::new(
            directory,
            Arc::new(PasswordHasher::new(1024, 1, 1).unwrap()),
            TokenCodec::new(SECRET),
            8,
            auto_verify,
        )
    }

    fn register_input(email: &str) -> RegisterInput {
        RegisterInput {
            first_name: "A".into(),
            last_name: "B".into(),
            email: email.into(),
            password: "secret123".into(),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let directory = Arc::new(MemoryDirectory::new());
        let service = service(directory.clone(), true);

        let message = service.register(register_input("a@x.com")).await.unwrap();
        assert_eq!(message, "User a@x.com registered successfully");

        let stored = directory.get_by_email("a@x.com").await.unwrap();
        assert_eq!(stored.role, Role::Member);
        assert!(stored.verified);
        assert!(stored.provider.is_none());
        assert_ne!(stored.password_hash.as_deref(), Some("secret123"));

        let token = service
            .login(login_input(" A@X.com ", "secret123"))
            .await
            .unwrap();
        let claims = TokenCodec::new(SECRET).verify(&token).unwrap();
        assert_eq!(claims.id, stored.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.name, "A B");
    }

    #[tokio::test]
    async fn duplicate_registration_keeps_first_record() {
        let directory = Arc::new(MemoryDirectory::new());
        let service = service(directory.clone(), true);
        service.register(register_input("a@x.com")).await.unwrap();
        let first = directory.get_by_email("a@x.com").await.unwrap();

        let mut second = register_input("A@x.com");
        second.first_name = "Mallory".into();
        assert!(matches!(
            service.register(second).await,
            Err(AuthError::EmailExists)
        ));
        assert_eq!(directory.get_by_email("a@x.com").await.unwrap(), first);
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let directory = Arc::new(MemoryDirectory::new());
        let service = service(directory, true);
        service.register(register_input("a@x.com")).await.unwrap();

        let unknown = service
            .login(login_input("nobody@x.com", "secret123"))
            .await
            .unwrap_err();
        let wrong = service
            .login(login_input("a@x.com", "wrong-password"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn unverified_account_gets_no_token() {
        let directory = Arc::new(MemoryDirectory::new());
        let service = service(directory, false);
        service.register(register_input("a@x.com")).await.unwrap();

        assert!(matches!(
            service.login(login_input("a@x.com", "secret123")).await,
            Err(AuthError::Unverified)
        ));
    }

    #[tokio::test]
    async fn federated_account_cannot_password_login() {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .create(NewUser {
                first_name: "G".into(),
                last_name: "H".into(),
                email: "g@x.com".into(),
                password_hash: None,
                role: Role::Member,
                verified: true,
                provider: Some("github".into()),
            })
            .await
            .unwrap();
        let service = service(directory, true);

        assert!(matches!(
            service.login(login_input("g@x.com", "anything")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn invalid_registration_writes_nothing() {
        let directory = Arc::new(MemoryDirectory::new());
        let service = service(directory.clone(), true);
        let mut input = register_input("a@x.com");
        input.password = "short".into();

        assert!(matches!(
            service.register(input).await,
            Err(AuthError::Validation(_))
        ));
        assert!(directory.is_empty());
    }
}
