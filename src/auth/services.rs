use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};
use crate::{
    error::AppError,
    users::{NewUser, StoreError, User, UserStore},
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Registration and login.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
    enforce_code_expiry: bool,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys, enforce_code_expiry: bool) -> Self {
        Self {
            store,
            keys,
            enforce_code_expiry,
        }
    }

    /// Creates a user, linking it to the owner of `referral_code` when one is
    /// given. The referrer link is fixed for the lifetime of the user.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        referral_code: Option<&str>,
    ) -> Result<User, AppError> {
        let email = email.trim();
        if !is_valid_email(email) {
            warn!(email, "invalid email");
            return Err(AppError::Validation("invalid email".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            warn!(email, "password too short");
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        // Fast path only; the store's unique constraint is authoritative.
        match self.store.find_by_email(email).await {
            Ok(_) => {
                warn!(email, "email already registered");
                return Err(AppError::DuplicateEmail);
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let referrer_id = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(self.resolve_referrer(code).await?),
            None => None,
        };

        let password_hash = hash_password(password)?;
        let user = self
            .store
            .insert(NewUser {
                email: email.to_string(),
                password_hash,
                referrer_id,
            })
            .await?;

        info!(user_id = user.id, referrer_id = ?user.referrer_id, "user registered");
        Ok(user)
    }

    async fn resolve_referrer(&self, code: &str) -> Result<i64, AppError> {
        let referrer = match self.store.find_by_referral_code(code).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!("unknown referral code");
                return Err(AppError::Validation("invalid referral code".into()));
            }
            Err(e) => return Err(e.into()),
        };

        if referrer
            .active_code(OffsetDateTime::now_utc(), self.enforce_code_expiry)
            .is_none()
        {
            warn!(referrer_id = referrer.id, "expired referral code");
            return Err(AppError::Validation("invalid referral code".into()));
        }
        Ok(referrer.id)
    }

    /// Verifies credentials and issues a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let invalid = || AppError::Unauthorized("invalid credentials".into());

        let user = match self.store.find_by_email(email.trim()).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                warn!("login unknown email");
                return Err(invalid());
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "login invalid password");
            return Err(invalid());
        }

        let token = self.keys.sign(user.id)?;
        info!(user_id = user.id, "user logged in");
        Ok(token)
    }
}
