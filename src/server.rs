use sqlx::SqlitePool;

use crate::{config::Config, progress::aggregate::UnlockPolicy, student::TokenKeys};

/// State shared by every request handler.
#[derive(Clone)]
pub struct Server {
    pub database: SqlitePool,
    pub tokens: TokenKeys,
    pub unlock_policy: UnlockPolicy,
}

impl Server {
    pub fn new(database: SqlitePool, tokens: TokenKeys, unlock_policy: UnlockPolicy) -> Self {
        Self {
            database,
            tokens,
            unlock_policy,
        }
    }

    pub fn from_config(database: SqlitePool, config: &Config, jwt_secret: &str) -> Self {
        Self::new(
            database,
            TokenKeys::new(jwt_secret.as_bytes(), config.token_ttl()),
            config.unlock_policy,
        )
    }
}
