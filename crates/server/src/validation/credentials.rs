use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AuthError;

/// Trimmed, lower-cased form used as the directory key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural check only: one `@`, a non-empty local part and a dotted domain
/// made of DNS-safe labels.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::Validation("email must not be empty".to_string()));
    }
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(AuthError::Validation(format!("invalid email: {email}")));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::Validation(format!(
            "invalid email: {email} (missing '@')"
        )));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(AuthError::Validation(format!("invalid email: {email}")));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(AuthError::Validation(format!(
            "invalid email: {email} (invalid domain)"
        )));
    }
    for label in domain.split('.') {
        if label.is_empty() || label.starts_with('-') || label.ends_with('-') {
            return Err(AuthError::Validation(format!(
                "invalid email: {email} (invalid domain)"
            )));
        }
        if let Some(c) = label
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            return Err(AuthError::Validation(format!(
                "invalid email: {email} (invalid character '{c}')"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl LoginInput {
    /// Only checks presence; anything else is answered with the generic
    /// credentials failure.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::Validation(
                "email and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    /// Check shape and return the input with names trimmed and the email
    /// normalized.
    pub fn validate(self, min_password_length: usize) -> Result<Self, AuthError> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        if first_name.is_empty() {
            return Err(AuthError::Validation(
                "first_name must not be empty".to_string(),
            ));
        }
        if last_name.is_empty() {
            return Err(AuthError::Validation(
                "last_name must not be empty".to_string(),
            ));
        }

        let email = normalize_email(&self.email);
        validate_email(&email)?;

        if self.password.chars().count() < min_password_length {
            return Err(AuthError::Validation(format!(
                "password must be at least {min_password_length} characters"
            )));
        }

        Ok(Self {
            first_name,
            last_name,
            email,
            password: self.password,
        })
    }
}
