use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{
    config::{JwtConfig, MAX_TTL_MINUTES},
    state::AppState,
};

/// JWT payload used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,    // user ID
    pub iat: usize,  // issued at
    pub exp: usize,  // expiration time
    pub iss: String, // issuer
    pub aud: String, // audience
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let secret = cfg.secret.expose_secret().as_bytes();
        let ttl_minutes = cfg.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64;
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(ttl_minutes * 60),
        }
    }

    pub fn sign(&self, user_id: i64) -> Result<String, TokenError> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn sign_at(
        &self,
        user_id: i64,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let exp = issued_at + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Returns the subject user id of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_claims(token).map(|c| c.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use secrecy::Secret;

    fn config(secret: &str, issuer: &str, audience: &str, ttl_minutes: i64) -> JwtConfig {
        JwtConfig {
            secret: Secret::new(secret.into()),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes,
        }
    }

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from_config(&config(secret, issuer, audience, 60 * 24))
    }

    #[test]
    fn out_of_range_ttl_is_clamped() {
        let keys = JwtKeys::from_config(&config("s", "iss", "aud", i64::MAX));
        assert_eq!(keys.ttl, Duration::from_secs(MAX_TTL_MINUTES as u64 * 60));
        let token = keys.sign(9).expect("sign");
        assert_eq!(keys.verify(&token).unwrap(), 9);

        let keys = JwtKeys::from_config(&config("s", "iss", "aud", -10));
        assert_eq!(keys.ttl, Duration::ZERO);
    }

    #[test]
    fn sign_and_verify_returns_subject() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(42).expect("sign");
        let claims = keys.verify_claims(&token).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
        assert_eq!(keys.verify(&token).unwrap(), 42);
    }

    #[test]
    fn token_past_its_window_is_expired() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc()
            - TimeDuration::seconds(keys.ttl.as_secs() as i64)
            - TimeDuration::seconds(5);
        let token = keys.sign_at(7, issued).expect("sign");
        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_inside_its_window_is_accepted() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(23);
        let token = keys.sign_at(7, issued).expect("sign");
        assert_eq!(keys.verify(&token).unwrap(), 7);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.sign(1).expect("sign");
        let sig_start = token.rfind('.').unwrap() + 1;
        let first = token.as_bytes()[sig_start];
        let replacement = if first == b'A' { "B" } else { "A" };
        let mut tampered = token.clone();
        tampered.replace_range(sig_start..sig_start + 1, replacement);
        assert!(matches!(keys.verify(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn malformed_or_foreign_tokens_are_invalid() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.verify("not-a-jwt"), Err(TokenError::Invalid)));
        assert!(matches!(keys.verify(""), Err(TokenError::Invalid)));

        let other = make_keys("other-secret", "iss", "aud");
        let token = other.sign(1).expect("sign");
        assert!(matches!(keys.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.sign(1).expect("sign");
        assert!(matches!(bad.verify(&token), Err(TokenError::Invalid)));
    }
}
