use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, progress::aggregate::UnlockPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    /// Daily-rotated log files go here; stdout when unset.
    pub log_dir: Option<PathBuf>,
    pub session_ttl_days: i64,
    pub token_ttl_hours: i64,
    pub unlock_policy: UnlockPolicy,
    pub request_timeout_secs: u64,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("database/course.db"),
            log_dir: None,
            session_ttl_days: 5,
            token_ttl_hours: 24,
            unlock_policy: UnlockPolicy::default(),
            request_timeout_secs: 30,
            tls: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::days(self.session_ttl_days)
    }

    pub fn token_ttl(&self) -> time::Duration {
        time::Duration::hours(self.token_ttl_hours)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// Signing secret for access tokens, from the environment or `.env`.
pub fn jwt_secret() -> Result<String> {
    let _ = dotenvy::dotenv();
    dotenvy::var("JWT_SECRET").map_err(|_| Error::Config("JWT_SECRET is not set".to_string()))
}
