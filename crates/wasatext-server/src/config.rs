use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = get("WASATEXT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("WASATEXT_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let host = get("WASATEXT_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("WASATEXT_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("WASATEXT_PORT must be a port number")?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid listen address {host}:{port}"))?;

        let db_path = get("WASATEXT_DB_PATH")
            .unwrap_or_else(|| "wasatext.db".into())
            .into();

        let token_ttl_days: i64 = get("WASATEXT_TOKEN_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("WASATEXT_TOKEN_TTL_DAYS must be an integer")?;
        if token_ttl_days <= 0 {
            bail!("WASATEXT_TOKEN_TTL_DAYS must be positive");
        }

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            token_ttl_days,
        })
    }
}
