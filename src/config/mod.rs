use std::fmt;
use std::path::PathBuf;

use lettre::Address;
use url::Url;

use crate::errors::{WatcherError, WatcherResult};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
pub const DEFAULT_STATE_FILE: &str = "seen_feed_items.json";

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed_urls: Vec<String>,
    pub smtp: SmtpConfig,
    pub email_from: String,
    pub email_to: Vec<String>,
    pub state_file: PathBuf,
    pub bootstrap_on_empty_state: bool,
    pub max_items_per_feed: Option<usize>,
    pub max_ids_per_feed: Option<usize>,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> WatcherResult<Self> {
        // Try to load .env from executable's directory first
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> WatcherResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required =
            |key: &str| var(key).ok_or_else(|| WatcherError::MissingEnvVar(key.to_string()));

        let feed_urls = parse_feed_urls(&required("FEED_URLS")?)?;

        let username = required("SMTP_USERNAME")?;
        let password = required("SMTP_PASSWORD")?;

        let email_to = split_list(&required("EMAIL_TO")?);
        if email_to.is_empty() {
            return Err(WatcherError::MissingEnvVar("EMAIL_TO".to_string()));
        }
        for address in &email_to {
            validate_address("EMAIL_TO", address)?;
        }

        let email_from = var("EMAIL_FROM").unwrap_or_else(|| username.clone());
        validate_address("EMAIL_FROM", &email_from)?;

        let host = var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let port = match var("SMTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| {
                    WatcherError::Config(format!("SMTP_PORT must be a port number, got '{}'", raw))
                })?,
            None => DEFAULT_SMTP_PORT,
        };

        let state_file = var("STATE_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));

        let bootstrap_on_empty_state = match var("BOOTSTRAP_ON_EMPTY_STATE") {
            Some(raw) => parse_bool("BOOTSTRAP_ON_EMPTY_STATE", &raw)?,
            None => true,
        };

        Ok(Self {
            feed_urls,
            smtp: SmtpConfig {
                host,
                port,
                username,
                password,
            },
            email_from,
            email_to,
            state_file,
            bootstrap_on_empty_state,
            max_items_per_feed: parse_limit("MAX_ITEMS_PER_FEED", var("MAX_ITEMS_PER_FEED"))?,
            max_ids_per_feed: parse_limit("MAX_IDS_PER_FEED", var("MAX_IDS_PER_FEED"))?,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_feed_urls(raw: &str) -> WatcherResult<Vec<String>> {
    let mut urls: Vec<String> = Vec::new();
    for url in split_list(raw) {
        Url::parse(&url).map_err(|e| {
            WatcherError::Config(format!("FEED_URLS contains an invalid URL '{}': {}", url, e))
        })?;
        if !urls.contains(&url) {
            urls.push(url);
        }
    }

    if urls.is_empty() {
        return Err(WatcherError::MissingEnvVar("FEED_URLS".to_string()));
    }
    Ok(urls)
}

fn validate_address(key: &str, address: &str) -> WatcherResult<()> {
    address.parse::<Address>().map(|_| ()).map_err(|e| {
        WatcherError::Config(format!("{} has an invalid address '{}': {}", key, address, e))
    })
}

fn parse_bool(key: &str, raw: &str) -> WatcherResult<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(WatcherError::Config(format!(
            "{} must be true or false, got '{}'",
            key, raw
        ))),
    }
}

fn parse_limit(key: &str, raw: Option<String>) -> WatcherResult<Option<usize>> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| {
                WatcherError::Config(format!("{} must be a positive integer, got '{}'", key, raw))
            }),
    }
}
