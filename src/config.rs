use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Contact backend settings.
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub site_origin: String,
    pub assets_dir: PathBuf,

    // Storage
    pub messages_file: PathBuf,

    // Admin
    pub admin_key: String,

    // Abuse protection
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub captcha_ttl: Duration,
    /// Key limits on `X-Forwarded-For` instead of the socket peer. Only
    /// safe behind a proxy that overwrites the header.
    pub trust_proxy: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let admin_key = std::env::var("ADMIN_KEY").context("ADMIN_KEY not set")?;
        if admin_key.trim().is_empty() {
            anyhow::bail!("ADMIN_KEY must not be empty");
        }

        Ok(Self {
            // Server
            port: parse_var("PORT")?.unwrap_or(3001),
            site_origin: std::env::var("SITE_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            assets_dir: std::env::var("ASSETS_DIR")
                .unwrap_or_else(|_| "assets".to_string())
                .into(),

            // Storage
            messages_file: std::env::var("MESSAGES_FILE")
                .unwrap_or_else(|_| "data/messages.json".to_string())
                .into(),

            // Admin
            admin_key,

            // Abuse protection
            rate_limit_max: parse_var("RATE_LIMIT_MAX")?.unwrap_or(10),
            rate_limit_window: Duration::from_secs(
                parse_var("RATE_LIMIT_WINDOW_SECS")?.unwrap_or(15 * 60),
            ),
            captcha_ttl: Duration::from_secs(parse_var("CAPTCHA_TTL_SECS")?.unwrap_or(10 * 60)),
            trust_proxy: parse_var("TRUST_PROXY")?.unwrap_or(false),
        })
    }

    /// Defaults for tests and local tooling.
    pub fn with_admin_key(admin_key: &str, messages_file: impl Into<PathBuf>) -> Self {
        Self {
            port: 3001,
            site_origin: "http://localhost:4200".to_string(),
            assets_dir: PathBuf::from("assets"),
            messages_file: messages_file.into(),
            admin_key: admin_key.to_string(),
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(15 * 60),
            captcha_ttl: Duration::from_secs(10 * 60),
            trust_proxy: false,
        }
    }
}

/// Settings for the site side: where dictionaries come from and where the
/// contact form posts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub site_url: String,
    /// `None` when no backend is deployed.
    pub contact_endpoint: Option<String>,
    pub storage_file: PathBuf,
    pub geo_lookup: bool,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            site_url: std::env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string())
                .trim_end_matches('/')
                .to_string(),
            contact_endpoint: std::env::var("CONTACT_ENDPOINT")
                .ok()
                .filter(|endpoint| !endpoint.trim().is_empty()),
            storage_file: std::env::var("STORAGE_FILE")
                .unwrap_or_else(|_| "data/client-storage.json".to_string())
                .into(),
            geo_lookup: parse_var("GEO_LOOKUP")?.unwrap_or(true),
        })
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(None),
    }
}
