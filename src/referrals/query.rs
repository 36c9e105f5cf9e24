use std::sync::Arc;

use time::OffsetDateTime;
use tracing::error;

use crate::{
    error::AppError,
    users::{StoreError, UserStore},
};

/// Read-only lookups over referral codes and referrer links.
#[derive(Clone)]
pub struct ReferralGraph {
    store: Arc<dyn UserStore>,
    enforce_expiry: bool,
}

impl ReferralGraph {
    pub fn new(store: Arc<dyn UserStore>, enforce_expiry: bool) -> Self {
        Self {
            store,
            enforce_expiry,
        }
    }

    pub async fn code_by_email(&self, email: &str) -> Result<String, AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::Validation("valid email is required".into()));
        }

        let user = match self.store.find_by_email(email).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => return Err(AppError::NotFound("user not found".into())),
            Err(e) => {
                error!(error = %e, "code lookup failed");
                return Err(AppError::internal("could not get user", e));
            }
        };

        user.active_code(OffsetDateTime::now_utc(), self.enforce_expiry)
            .map(str::to_string)
            .ok_or_else(|| AppError::NotFound("user does not have a referral code".into()))
    }

    /// Emails of the users registered with a code owned by `referrer_id`.
    pub async fn referrals_by_referrer(&self, referrer_id: i64) -> Result<Vec<String>, AppError> {
        if referrer_id <= 0 {
            return Err(AppError::Validation("valid referrer_id is required".into()));
        }

        let referred = self.store.list_referred_by(referrer_id).await.map_err(|e| {
            error!(error = %e, referrer_id, "referral listing failed");
            AppError::internal("could not get referrals", e)
        })?;
        Ok(referred.into_iter().map(|u| u.email).collect())
    }
}
