use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use super::code::generate_code;
use crate::{
    error::AppError,
    users::{StoreError, UserStore},
};

/// Attempts before giving up on random-code collisions.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Issues and revokes the single referral code a user may hold.
#[derive(Clone)]
pub struct ReferralService {
    store: Arc<dyn UserStore>,
    code_ttl: Duration,
}

impl ReferralService {
    pub fn new(store: Arc<dyn UserStore>, code_ttl: Duration) -> Self {
        Self { store, code_ttl }
    }

    pub async fn create_code(&self, user_id: i64) -> Result<String, AppError> {
        let user = self.store.find_by_id(user_id).await?;
        if user
            .referral_code
            .as_deref()
            .is_some_and(|c| !c.is_empty())
        {
            warn!(user_id, "referral code already active");
            return Err(AppError::Conflict("user already has a referral code".into()));
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_code();
            let expiry = OffsetDateTime::now_utc() + self.code_ttl;
            match self
                .store
                .set_referral_code(user_id, Some(code.as_str()), Some(expiry))
                .await
            {
                Ok(()) => {
                    info!(user_id, %expiry, "referral code created");
                    return Ok(code);
                }
                Err(StoreError::DuplicateReferralCode) => {
                    warn!(user_id, attempt, "referral code collision");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "could not allocate a unique referral code".into(),
        ))
    }

    pub async fn delete_code(&self, user_id: i64) -> Result<(), AppError> {
        let user = self.store.find_by_id(user_id).await?;
        if user.referral_code.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::NotFound("referral code not found".into()));
        }

        self.store.set_referral_code(user_id, None, None).await?;
        info!(user_id, "referral code deleted");
        Ok(())
    }
}
