use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::auth::{jwt::JwtKeys, services::AuthService};
use crate::config::AppConfig;
use crate::referrals::{query::ReferralGraph, services::ReferralService};
use crate::users::{InMemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
    pub auth: AuthService,
    pub referrals: ReferralService,
    pub graph: ReferralGraph,
}

impl AppState {
    /// Builds the state from the environment. Returns the pool as well when
    /// a database is configured so the caller can run migrations.
    pub async fn init() -> anyhow::Result<(Self, Option<PgPool>)> {
        let config = Arc::new(AppConfig::from_env()?);

        match config.database_url.as_deref() {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                info!("using postgres user store");
                let store = Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>;
                Ok((Self::from_parts(config, store), Some(db)))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                let store = Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>;
                Ok((Self::from_parts(config, store), None))
            }
        }
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        let referral = &config.referral;
        Self {
            auth: AuthService::new(store.clone(), keys.clone(), referral.enforce_expiry),
            referrals: ReferralService::new(
                store.clone(),
                time::Duration::hours(referral.code_ttl_hours),
            ),
            graph: ReferralGraph::new(store, referral.enforce_expiry),
            keys,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, ReferralConfig};

        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            database_url: None,
            jwt: JwtConfig {
                secret: secrecy::Secret::new("test".into()),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60 * 24,
            },
            referral: ReferralConfig::default(),
        });
        Self::from_parts(config, Arc::new(InMemoryUserStore::new()))
    }
}
