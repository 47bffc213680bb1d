//! Configuration for Scribe
//!
//! CLI arguments and environment variables via clap. A `.env` file in the
//! working directory is loaded before parsing.

use chrono::Duration;
use clap::Parser;
use std::net::SocketAddr;

use crate::auth::JwtValidator;
use crate::types::ScribeError;

/// Upper bound for `TOKEN_TTL_MINUTES` (7 days)
pub const MAX_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Scribe - social blogging API
#[derive(Parser, Debug, Clone)]
#[command(name = "scribe")]
#[command(about = "REST backend for a social blogging platform")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Development mode (fixed JWT secret, mail goes to the log)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "scribe")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required outside dev mode)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (20 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "1728000")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Lifetime of verification and reset tokens, in minutes
    #[arg(long, env = "TOKEN_TTL_MINUTES", default_value = "30")]
    pub token_ttl_minutes: i64,

    /// Frontend base URL used in mailed links
    #[arg(long, env = "CLIENT_URL", default_value = "http://localhost:3000")]
    pub client_url: String,

    /// Sender address for outgoing mail
    #[arg(long, env = "MAIL_FROM", default_value = "noreply@scribe.local")]
    pub mail_from: String,

    /// SendGrid API key; without it mail is only logged
    #[arg(long, env = "SENDGRID_API_KEY")]
    pub sendgrid_api_key: Option<String>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.token_ttl_minutes <= 0 {
            return Err("TOKEN_TTL_MINUTES must be positive".to_string());
        }
        if self.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(format!(
                "TOKEN_TTL_MINUTES must be at most {}",
                MAX_TOKEN_TTL_MINUTES
            ));
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be positive".to_string());
        }

        if !(self.client_url.starts_with("http://") || self.client_url.starts_with("https://")) {
            return Err("CLIENT_URL must be an http(s) URL".to_string());
        }

        Ok(())
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::minutes(self.token_ttl_minutes.clamp(1, MAX_TOKEN_TTL_MINUTES))
    }

    /// Session token validator for the configured mode
    pub fn jwt_validator(&self) -> Result<JwtValidator, ScribeError> {
        if self.dev_mode {
            return Ok(JwtValidator::new_dev(self.jwt_expiry_seconds));
        }
        match &self.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            None => Err(ScribeError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["scribe"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.listen.port(), 5000);
        assert_eq!(args.mongodb_db, "scribe");
        assert_eq!(args.token_ttl(), Duration::minutes(30));
        assert_eq!(args.jwt_expiry_seconds, 20 * 24 * 60 * 60);
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = parse(&[]);
        assert!(args.validate().is_err());
        assert!(args.jwt_validator().is_err());

        let args = parse(&["--jwt-secret", "a-production-secret-of-at-least-32-chars"]);
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let args = parse(&["--dev-mode", "--token-ttl-minutes", "0"]);
        assert!(args.validate().is_err());

        let too_long = (MAX_TOKEN_TTL_MINUTES + 1).to_string();
        let args = parse(&["--dev-mode", "--token-ttl-minutes", &too_long]);
        assert!(args.validate().is_err());
        let args = parse(&["--dev-mode", "--token-ttl-minutes", "9223372036854775807"]);
        assert!(args.validate().is_err());
        let max = MAX_TOKEN_TTL_MINUTES.to_string();
        let args = parse(&["--dev-mode", "--token-ttl-minutes", &max]);
        assert!(args.validate().is_ok());

        let args = parse(&["--dev-mode", "--client-url", "localhost:3000"]);
        assert!(args.validate().is_err());
    }
}
