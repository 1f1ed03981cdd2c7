//! Configuration module for the Community Hub backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for admin API authentication (required in production)
    pub admin_psk: Option<String>,
    /// Shared secret expected on payment gateway webhooks
    pub payment_webhook_secret: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory holding the durable listing-cache tiers
    pub cache_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Interval between listing refresher polls
    pub refresh_interval: Duration,
    /// Deadline applied to submission-store fetches
    pub fetch_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_psk = env::var("HUB_ADMIN_PSK").ok();
        let payment_webhook_secret = env::var("HUB_PAYMENT_WEBHOOK_SECRET").ok();

        let db_path = env::var("HUB_DB_PATH")
            .unwrap_or_else(|_| "./data/hub.sqlite".to_string())
            .into();

        let cache_dir = env::var("HUB_CACHE_DIR")
            .unwrap_or_else(|_| "./data/cache".to_string())
            .into();

        let bind_addr = env::var("HUB_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid HUB_BIND_ADDR format");

        let refresh_interval = env::var("HUB_REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(15));

        let fetch_timeout = env::var("HUB_FETCH_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let log_level = env::var("HUB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            admin_psk,
            payment_webhook_secret,
            db_path,
            cache_dir,
            bind_addr,
            refresh_interval,
            fetch_timeout,
            log_level,
        }
    }
}
