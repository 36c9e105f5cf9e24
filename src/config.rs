use std::net::SocketAddr;

use secrecy::{Secret, SecretString};
use serde::Deserialize;

/// Upper bound for token lifetimes: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_TTL_MINUTES).contains(&self.ttl_minutes) {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {}, got {}",
                MAX_TTL_MINUTES,
                self.ttl_minutes
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferralConfig {
    pub code_ttl_hours: i64,
    /// When set, expired codes are treated as absent on lookup.
    pub enforce_expiry: bool,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            code_ttl_hours: 24,
            enforce_expiry: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub referral: ReferralConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: Secret::new(
                std::env::var("JWT_SECRET")
                    .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?,
            ),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "refcode".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "refcode-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24),
        };
        jwt.validate()?;
        let referral = ReferralConfig {
            code_ttl_hours: env_parse("REFERRAL_CODE_TTL_HOURS").unwrap_or(24),
            enforce_expiry: env_flag("REFERRAL_ENFORCE_EXPIRY"),
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8077),
            database_url,
            jwt,
            referral,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
