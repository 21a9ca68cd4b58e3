use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::oauth::Provider;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub session: SessionConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub federation: FederationConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    /// HMAC key used to sign session tokens.
    pub secret: String,
    /// Request header carrying the session token on authenticated requests.
    #[serde(default = "default_token_header")]
    pub header: String,
}

/// Password policy and Argon2id work factor.
#[derive(Clone, Debug, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegistrationConfig {
    /// Mark locally registered accounts as verified immediately. Nothing in this
    /// service delivers verification mail, so turning this off leaves new
    /// accounts unable to log in until something else flips `verified`.
    #[serde(default = "default_true")]
    pub auto_verify: bool,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self { auto_verify: true }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct FederationConfig {
    /// Allow a federated login to reuse an account created by password
    /// registration (matched by email). When false such logins are rejected.
    #[serde(default = "default_true")]
    pub link_local_accounts: bool,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    pub google: Option<ProviderConfig>,
    pub github: Option<ProviderConfig>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            link_local_accounts: true,
            http_timeout_secs: default_http_timeout_secs(),
            google: None,
            github: None,
        }
    }
}

impl FederationConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        match provider {
            Provider::Google => self.google.as_ref(),
            Provider::Github => self.github.as_ref(),
        }
    }
}

/// Credentials for one OAuth2 provider. Endpoint overrides exist so the flow
/// can be pointed at a local stub; leave them unset in production.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: Option<String>,
    pub token_url: Option<String>,
    pub profile_url: Option<String>,
    pub emails_url: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_token_header() -> String {
    "x-token".to_string()
}

fn default_min_length() -> usize {
    8
}

// OWASP baseline for Argon2id: m=19 MiB, t=2, p=1.
fn default_memory_kib() -> u32 {
    19 * 1024
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.secret.len() < 32 {
            return Err(ConfigError::Validation(
                "session.secret must be at least 32 bytes".into(),
            ));
        }
        if self.session.header.trim().is_empty() {
            return Err(ConfigError::Validation(
                "session.header must not be empty".into(),
            ));
        }
        if self.password.min_length == 0 {
            return Err(ConfigError::Validation(
                "password.min_length must be > 0".into(),
            ));
        }
        if self.federation.http_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "federation.http_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// A `.env` file is read first if present. Any variable matching the key path
/// separated by double underscores (e.g. `SESSION__SECRET`) overrides the file
/// value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};

    dotenvy::dotenv().ok();

    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
