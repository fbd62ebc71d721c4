use anyhow::Context;
use serde::Deserialize;

use crate::db::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Attempts per storage call; 1 means no retry.
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub command: String,
    pub lang: String,
    pub timeout_secs: u64,
}

/// Fixed options offered to the user and recognised on receipts.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    pub categories: &'static [Category],
    pub currency_markers: &'static [&'static str],
}

impl TrackerConfig {
    pub const DEFAULT: TrackerConfig = TrackerConfig {
        categories: &Category::ALL,
        currency_markers: &["₹", "Rs", "Rs.", "INR"],
    };
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub session: SessionConfig,
    pub ocr: OcrConfig,
    pub tracker: TrackerConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = std::env::var("STORE_BACKEND")
            .ok()
            .map(|v| v.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);
        let database_url = std::env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }
        let store = StoreConfig {
            backend,
            database_url,
            max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            max_attempts: env_parse::<u32>("STORE_MAX_ATTEMPTS").unwrap_or(1).max(1),
        };

        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "expense-tracker".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "expense-tracker-users".into()),
            ttl_minutes: env_parse("SESSION_TTL_MINUTES").unwrap_or(60 * 12),
        };

        let ocr = OcrConfig {
            command: std::env::var("OCR_COMMAND").unwrap_or_else(|_| "tesseract".into()),
            lang: std::env::var("OCR_LANG").unwrap_or_else(|_| "eng".into()),
            timeout_secs: env_parse("OCR_TIMEOUT_SECS").unwrap_or(30),
        };

        Ok(Self {
            store,
            session,
            ocr,
            tracker: TrackerConfig::DEFAULT,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
