use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:12000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub media_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub model_path: Option<PathBuf>,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub upload_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", DEFAULT_HTTP_ADDR);
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        Ok(Self {
            http_addr,
            database_url: env_or("DATABASE_URL", "sqlite://mri.db"),
            media_dir: PathBuf::from(env_or("MEDIA_DIR", "media")),
            cors_origins: parse_origins(&env_or("CORS_ORIGINS", "*")),
            model_path: std::env::var("MODEL_PATH").ok().map(PathBuf::from),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "5")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            upload_max_bytes: env_or_parse("UPLOAD_MAX_BYTES", "52428800")?,
        })
    }
}

/// Splits a comma-separated origin list, dropping blanks. An empty list
/// falls back to the wildcard.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
