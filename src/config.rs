//! Environment-based configuration types for OIDP server runtime settings.

use anyhow::Result;

use crate::errors::ConfigError;

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// Symmetric secret used to sign ID tokens
#[derive(Clone)]
pub struct SigningSecret(String);

/// Lifetime wrapper parsed from a duration string such as `10m` or `30d`
#[derive(Clone, Copy)]
pub struct TokenTtl(chrono::Duration);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub http_templates_path: String,
    /// External base URL of this server; doubles as the OIDC issuer.
    pub external_base: String,
    pub id_token_signing_secret: SigningSecret,
    pub auth_code_ttl: TokenTtl,
    pub access_token_ttl: TokenTtl,
    pub refresh_token_ttl: TokenTtl,
    pub id_token_ttl: TokenTtl,
    pub storage_backend: String,
    pub seed_demo: bool,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let external_base = require_env("EXTERNAL_BASE")?;
        let id_token_signing_secret: SigningSecret =
            require_env("ID_TOKEN_SIGNING_SECRET")?.try_into()?;
        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let http_templates_path = optional_env("HTTP_TEMPLATES_PATH")
            .unwrap_or_else(|| format!("{}/templates", env!("CARGO_MANIFEST_DIR")));
        let auth_code_ttl: TokenTtl = default_env("AUTH_CODE_TTL", "10m").try_into()?;
        let access_token_ttl: TokenTtl = default_env("ACCESS_TOKEN_TTL", "1h").try_into()?;
        let refresh_token_ttl: TokenTtl = default_env("REFRESH_TOKEN_TTL", "30d").try_into()?;
        let id_token_ttl: TokenTtl = default_env("ID_TOKEN_TTL", "1h").try_into()?;
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let seed_demo = optional_env("OIDP_SEED_DEMO")
            .map(|v| v == "true")
            .unwrap_or(false);

        Ok(Self {
            version: version()?,
            http_port,
            http_templates_path,
            external_base,
            id_token_signing_secret,
            auth_code_ttl,
            access_token_ttl,
            refresh_token_ttl,
            id_token_ttl,
            storage_backend,
            seed_demo,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for SigningSecret {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Err(ConfigError::SigningSecretEmpty.into())
        } else {
            Ok(Self(value))
        }
    }
}

impl AsRef<str> for SigningSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TokenTtl {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let std_duration = duration_str::parse(&value)
            .map_err(|err| ConfigError::DurationParsingFailed(value.clone(), err.to_string()))?;
        let duration = chrono::Duration::from_std(std_duration)
            .map_err(|err| ConfigError::DurationParsingFailed(value, err.to_string()))?;
        Ok(Self(duration))
    }
}

impl AsRef<chrono::Duration> for TokenTtl {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}
