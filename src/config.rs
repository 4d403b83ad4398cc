use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_DATABASE_PATH: &str = "data/docs.db";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub log_level: String,
}

impl AppConfig {
    /// Read configuration from the process environment, after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key))
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let bind_addr = optional(&lookup, "DOCS_BIND_ADDR")?
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("parse DOCS_BIND_ADDR")?;

        let database_path = optional(&lookup, "DOCS_DATABASE_PATH")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let log_level =
            optional(&lookup, "DOCS_LOG_LEVEL")?.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let jwt_secret = required(&lookup, "JWT_SECRET")?;

        Ok(Self {
            bind_addr,
            database_path,
            jwt_secret,
            log_level,
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> anyhow::Result<Option<String>>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(key) {
        Ok(value) => {
            let value = value.trim();
            if value.is_empty() {
                Ok(None)
            } else {
                Ok(Some(value.to_string()))
            }
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            anyhow::bail!("{} is not valid unicode", key);
        }
    }
}

fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match lookup(key) {
        Ok(value) => {
            let value = value.trim();
            if value.is_empty() {
                anyhow::bail!("{} is set but empty", key);
            }
            Ok(value.to_string())
        }
        Err(env::VarError::NotPresent) => {
            anyhow::bail!("{} is required but not set", key);
        }
        Err(env::VarError::NotUnicode(_)) => {
            anyhow::bail!("{} is not valid unicode", key);
        }
    }
}
