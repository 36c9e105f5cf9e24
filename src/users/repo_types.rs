use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub referrer_id: Option<i64>,
    pub referral_code: Option<String>,
    pub code_expiry: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// The user's referral code, if one is set and non-empty.
    ///
    /// With `enforce_expiry`, a code whose expiry is at or before `now` is
    /// reported as absent.
    pub fn active_code(&self, now: OffsetDateTime, enforce_expiry: bool) -> Option<&str> {
        let code = self.referral_code.as_deref().filter(|c| !c.is_empty())?;
        if enforce_expiry {
            match self.code_expiry {
                Some(exp) if exp > now => {}
                _ => return None,
            }
        }
        Some(code)
    }
}

/// Fields supplied by the caller when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub referrer_id: Option<i64>,
}
