use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::error;

use super::{
    repo_types::{NewUser, User},
    store::{StoreError, UserStore},
};

const USER_COLUMNS: &str =
    "id, email, password_hash, referrer_id, referral_code, code_expiry, created_at";

const REFERRAL_CODE_CONSTRAINT: &str = "users_referral_code_key";

/// Postgres-backed store. Uniqueness and referrer integrity rest on the
/// constraints declared in `migrations/`.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, filter: &str, bind: FindBy<'_>) -> Result<User, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, filter);
        let query = sqlx::query_as::<_, User>(&sql);
        let query = match bind {
            FindBy::Text(v) => query.bind(v),
            FindBy::Id(v) => query.bind(v),
        };
        query
            .fetch_optional(&self.db)
            .await
            .map_err(|e| db_error("find user", e))?
            .ok_or(StoreError::NotFound)
    }
}

enum FindBy<'a> {
    Text(&'a str),
    Id(i64),
}

fn db_error(op: &str, e: sqlx::Error) -> StoreError {
    error!(error = %e, op, "postgres query failed");
    StoreError::Database(format!("{}: {}", op, e))
}

fn classify(op: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some(REFERRAL_CODE_CONSTRAINT) => StoreError::DuplicateReferralCode,
                _ => StoreError::DuplicateEmail,
            };
        }
        if db.is_foreign_key_violation() {
            return StoreError::UnknownReferrer;
        }
    }
    db_error(op, e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.find_one("email", FindBy::Text(email)).await
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.find_one("id", FindBy::Id(id)).await
    }

    async fn find_by_referral_code(&self, code: &str) -> Result<User, StoreError> {
        self.find_one("referral_code", FindBy::Text(code)).await
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, referrer_id)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.referrer_id)
            .fetch_one(&self.db)
            .await
            .map_err(|e| classify("insert user", e))
    }

    async fn set_referral_code(
        &self,
        user_id: i64,
        code: Option<&str>,
        expiry: Option<OffsetDateTime>,
    ) -> Result<(), StoreError> {
        let result = match code {
            Some(code) => sqlx::query(
                r#"
                UPDATE users
                SET referral_code = $2, code_expiry = $3
                WHERE id = $1 AND (referral_code IS NULL OR referral_code = '')
                "#,
            )
            .bind(user_id)
            .bind(code)
            .bind(expiry)
            .execute(&self.db)
            .await
            .map_err(|e| classify("set referral code", e))?,
            None => sqlx::query(
                r#"
                UPDATE users
                SET referral_code = NULL, code_expiry = NULL
                WHERE id = $1 AND referral_code IS NOT NULL AND referral_code <> ''
                "#,
            )
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| db_error("clear referral code", e))?,
        };

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing updated: either the user is missing or its code state
        // did not allow the transition.
        self.find_by_id(user_id).await?;
        Err(match code {
            Some(_) => StoreError::CodeAlreadyActive,
            None => StoreError::NoActiveCode,
        })
    }

    async fn list_referred_by(&self, referrer_id: i64) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users WHERE referrer_id = $1 ORDER BY id",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(referrer_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| db_error("list referrals", e))
    }
}
