use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

use vidhub_api::SessionPolicy;
use vidhub_auth::TokenConfig;
use vidhub_auth::tokens::{DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub tokens: TokenConfig,
    pub session_policy: SessionPolicy,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let access_secret = secret(get("VIDHUB_ACCESS_TOKEN_SECRET"), "VIDHUB_ACCESS_TOKEN_SECRET")?;
        let refresh_secret = secret(get("VIDHUB_REFRESH_TOKEN_SECRET"), "VIDHUB_REFRESH_TOKEN_SECRET")?;
        if access_secret == refresh_secret {
            bail!("VIDHUB_ACCESS_TOKEN_SECRET and VIDHUB_REFRESH_TOKEN_SECRET must differ");
        }

        let port = match get("VIDHUB_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("VIDHUB_PORT is not a port: {}", raw))?,
            None => 8000,
        };

        let access_minutes = number(get("VIDHUB_ACCESS_TOKEN_TTL_MINUTES"), "VIDHUB_ACCESS_TOKEN_TTL_MINUTES")?
            .unwrap_or(DEFAULT_ACCESS_TTL_MINUTES);
        let refresh_days = number(get("VIDHUB_REFRESH_TOKEN_TTL_DAYS"), "VIDHUB_REFRESH_TOKEN_TTL_DAYS")?
            .unwrap_or(DEFAULT_REFRESH_TTL_DAYS);

        let session_policy = match get("VIDHUB_SESSION_POLICY") {
            Some(raw) => SessionPolicy::parse(&raw)
                .with_context(|| format!("VIDHUB_SESSION_POLICY must be single or per-device, got {}", raw))?,
            None => SessionPolicy::default(),
        };

        let mut tokens = TokenConfig::new(access_secret, refresh_secret);
        tokens.access_ttl = Duration::minutes(access_minutes);
        tokens.refresh_ttl = Duration::days(refresh_days);

        Ok(Self {
            host: get("VIDHUB_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("VIDHUB_DB_PATH").unwrap_or_else(|| "vidhub.db".into()).into(),
            tokens,
            session_policy,
            cors_origin: get("VIDHUB_CORS_ORIGIN"),
        })
    }
}

fn secret(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !PLACEHOLDER_SECRETS.contains(&v.as_str()) => Ok(v),
        _ => bail!("{} is unset or still a placeholder. Set it in your .env file and restart.", key),
    }
}

/// Positive whole number, or `None` when unset.
fn number(value: Option<String>, key: &str) -> Result<Option<i64>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => bail!("{} must be a positive integer, got {}", key, raw),
    }
}
