//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use picata_core::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub cors_origin: String,
    pub canvas_url: String,
    pub canvas_token: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub model_timeout: Duration,
    pub attendance_dir: PathBuf,
    pub bundled_pdf_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub session_idle_timeout: chrono::Duration,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn parse_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// A session idle timeout must be positive and representable as a duration.
fn idle_timeout(minutes: i64) -> Result<chrono::Duration, ConfigError> {
    if minutes <= 0 {
        return Err(ConfigError::InvalidValue(
            "SESSION_IDLE_MINUTES".to_string(),
            format!("must be a positive number of minutes, got {}", minutes),
        ));
    }
    chrono::Duration::try_minutes(minutes).ok_or_else(|| {
        ConfigError::InvalidValue(
            "SESSION_IDLE_MINUTES".to_string(),
            format!("{} minutes is out of range", minutes),
        )
    })
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address = parse_or::<SocketAddr>("BIND_ADDRESS", ([0, 0, 0, 0], 3000).into())?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load LMS Credentials (mandatory) ---
        let canvas_url = required("CANVAS_URL")?.trim_end_matches('/').to_string();
        let canvas_token = required("CANVAS_TOKEN")?;

        // --- Load Model Host Settings ---
        let ollama_url = std::env::var("OLLAMA_URL")
            .unwrap_or_else(|_| "http://localhost:11434".to_string())
            .trim_end_matches('/')
            .to_string();
        let ollama_model =
            std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        let model_timeout = Duration::from_secs(parse_or("MODEL_TIMEOUT_SECS", 120u64)?);

        // --- Load Storage and Document Settings ---
        let attendance_dir = std::env::var("ATTENDANCE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/attendance"));
        let bundled_pdf_path = std::env::var("BUNDLED_PDF_PATH").ok().map(PathBuf::from);

        let chunk_size = parse_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let chunk_overlap = parse_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?;
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(
                "CHUNK_OVERLAP".to_string(),
                format!("must be smaller than CHUNK_SIZE ({})", chunk_size),
            ));
        }

        let session_idle_timeout = idle_timeout(parse_or("SESSION_IDLE_MINUTES", 60i64)?)?;

        Ok(Self {
            bind_address,
            log_level,
            cors_origin,
            canvas_url,
            canvas_token,
            ollama_url,
            ollama_model,
            model_timeout,
            attendance_dir,
            bundled_pdf_path,
            chunk_size,
            chunk_overlap,
            session_idle_timeout,
        })
    }
}
