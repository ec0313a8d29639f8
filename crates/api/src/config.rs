//! Process configuration loaded from environment variables.
//!
//! ## Required
//! - `APP_SECRET` - credential signing secret
//!
//! ## Optional
//! - `FRONTEND_URL` - origin used in reset links (default: `http://localhost:7777`)
//! - `BIND_ADDR` - listen address (default: `0.0.0.0:4444`)
//! - `DATABASE_URL` - Postgres connection string (needs the `postgres` feature)
//! - `MAIL_HOST`, `MAIL_PORT` (587), `MAIL_USER`, `MAIL_PASS` - SMTP relay
//! - `MAIL_FROM` - sender address (default: `no-reply@fitshop.local`)
//! - `COOKIE_SECURE` - mark the session cookie `Secure` (default: false)

use std::net::SocketAddr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use fitshop_infra::SmtpConfig;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:7777";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4444";
const DEFAULT_MAIL_PORT: &str = "587";
const DEFAULT_MAIL_FROM: &str = "no-reply@fitshop.local";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(&'static str, String),
}

/// Immutable after startup. Handed to the codec and account settings at
/// construction; business logic never reads the environment itself.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secret: SecretString,
    pub frontend_url: String,
    pub bind_addr: SocketAddr,
    pub database_url: Option<SecretString>,
    /// `None` means mail is logged instead of delivered.
    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let secret = get("APP_SECRET")
            .map(SecretString::from)
            .ok_or(ConfigError::MissingEnvVar("APP_SECRET"))?;

        let bind_addr = or_default("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("BIND_ADDR", e.to_string()))?;

        let smtp = match get("MAIL_HOST") {
            Some(host) => {
                let port = or_default("MAIL_PORT", DEFAULT_MAIL_PORT)
                    .parse::<u16>()
                    .map_err(|e| ConfigError::InvalidEnvVar("MAIL_PORT", e.to_string()))?;
                Some(SmtpConfig {
                    host,
                    port,
                    username: get("MAIL_USER"),
                    password: get("MAIL_PASS").map(SecretString::from),
                })
            }
            None => None,
        };

        let cookie_secure = match get("COOKIE_SECURE") {
            None => false,
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::InvalidEnvVar("COOKIE_SECURE", raw.clone()))?,
        };

        Ok(Self {
            secret,
            frontend_url: or_default("FRONTEND_URL", DEFAULT_FRONTEND_URL)
                .trim_end_matches('/')
                .to_string(),
            bind_addr,
            database_url: get("DATABASE_URL").map(SecretString::from),
            smtp,
            mail_from: or_default("MAIL_FROM", DEFAULT_MAIL_FROM),
            cookie_secure,
        })
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_ref().map(|url| url.expose_secret())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn secret_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar("APP_SECRET"))));
        assert!(matches!(
            load(&[("APP_SECRET", "  ")]),
            Err(ConfigError::MissingEnvVar("APP_SECRET"))
        ));
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("APP_SECRET", "s3cr3t")]).unwrap();
        assert_eq!(config.secret.expose_secret(), "s3cr3t");
        assert_eq!(config.frontend_url, DEFAULT_FRONTEND_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:4444".parse().unwrap());
        assert_eq!(config.mail_from, DEFAULT_MAIL_FROM);
        assert!(config.smtp.is_none());
        assert!(config.database_url().is_none());
        assert!(!config.cookie_secure);
    }

    #[test]
    fn smtp_block_needs_only_a_host() {
        let config = load(&[
            ("APP_SECRET", "s"),
            ("MAIL_HOST", "smtp.example.org"),
            ("MAIL_USER", "mailer"),
            ("MAIL_PASS", "pw"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.org");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username.as_deref(), Some("mailer"));
        assert_eq!(smtp.password.unwrap().expose_secret(), "pw");
    }

    #[test]
    fn bad_values_are_reported_by_name() {
        assert!(matches!(
            load(&[("APP_SECRET", "s"), ("BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidEnvVar("BIND_ADDR", _))
        ));
        assert!(matches!(
            load(&[("APP_SECRET", "s"), ("MAIL_HOST", "h"), ("MAIL_PORT", "x")]),
            Err(ConfigError::InvalidEnvVar("MAIL_PORT", _))
        ));
        assert!(matches!(
            load(&[("APP_SECRET", "s"), ("COOKIE_SECURE", "maybe")]),
            Err(ConfigError::InvalidEnvVar("COOKIE_SECURE", _))
        ));
    }

    #[test]
    fn frontend_url_loses_trailing_slash() {
        let config = load(&[("APP_SECRET", "s"), ("FRONTEND_URL", "https://shop.test/")]).unwrap();
        assert_eq!(config.frontend_url, "https://shop.test");
        assert!(load(&[("APP_SECRET", "s"), ("COOKIE_SECURE", "TRUE")]).unwrap().cookie_secure);
    }
}
