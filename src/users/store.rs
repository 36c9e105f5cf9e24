use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use super::repo_types::{NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("referrer does not exist")]
    UnknownReferrer,

    #[error("user already has a referral code")]
    CodeAlreadyActive,

    #[error("referral code already exists")]
    DuplicateReferralCode,

    #[error("user has no referral code")]
    NoActiveCode,

    #[error("database error: {0}")]
    Database(String),
}

/// Persistence boundary shared by every service.
///
/// Implementations enforce email and referral-code uniqueness, the
/// one-active-code rule and referrer existence inside each call, so two
/// concurrent callers can never both succeed where only one may.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;

    async fn find_by_referral_code(&self, code: &str) -> Result<User, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// `Some(code)` sets a code only if the user has none; `None` clears an
    /// active code.
    async fn set_referral_code(
        &self,
        user_id: i64,
        code: Option<&str>,
        expiry: Option<OffsetDateTime>,
    ) -> Result<(), StoreError>;

    async fn list_referred_by(&self, referrer_id: i64) -> Result<Vec<User>, StoreError>;
}
