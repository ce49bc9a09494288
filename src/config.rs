//! Server configuration, read from the environment (and `.env` via dotenv).

use anyhow::{Context, Result};
use std::env;

use crate::constants::{
    DEFAULT_ADDR, DEFAULT_DATABASE_URL, DEFAULT_RECENT_LOCATION_MINUTES, DEFAULT_SUPPORT_USER_ID,
    DEFAULT_TOKEN_EXPIRY_SECS,
};

/// Credentials for the account created on first start, when the users table is empty.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub pass: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind, e.g. `0.0.0.0:4433`
    pub addr: String,
    pub database_url: String,
    /// Shared HMAC secret for issuing and verifying tokens
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub jwt_expiration: u64,
    /// Id of the reserved account whose phone number `/help` returns
    pub support_user_id: i64,
    /// Default trailing window for `/getRecentlyLocation`
    pub recent_location_minutes: i64,
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set in env")?;

        let admin_seed = match (env::var("ADMIN_NAME"), env::var("ADMIN_PASS")) {
            (Ok(name), Ok(pass)) => Some(AdminSeed { name, pass }),
            _ => None,
        };

        Ok(Self {
            addr: env::var("ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", DEFAULT_TOKEN_EXPIRY_SECS)?,
            support_user_id: parse_var("SUPPORT_USER_ID", DEFAULT_SUPPORT_USER_ID)?,
            recent_location_minutes: parse_var(
                "RECENT_LOCATION_MINUTES",
                DEFAULT_RECENT_LOCATION_MINUTES,
            )?,
            admin_seed,
        })
    }

    /// Configuration for tests: an in-memory store and a fixed secret.
    pub fn for_tests() -> Self {
        Self {
            addr: "127.0.0.1:0".to_string(),
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expiration: DEFAULT_TOKEN_EXPIRY_SECS,
            support_user_id: DEFAULT_SUPPORT_USER_ID,
            recent_location_minutes: DEFAULT_RECENT_LOCATION_MINUTES,
            admin_seed: None,
        }
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
