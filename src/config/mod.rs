//! Configuration module for the course platform backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "./data/courses.sqlite";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid value for {}: {}", self.var, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
    /// Origins allowed to make credentialed cross-origin requests
    pub allowed_origins: Vec<String>,
    /// Upper bound on the time spent handling a single request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("COURSES_DB_PATH")
            .unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
            .into();

        let mut bind_addr: SocketAddr = env::var("COURSES_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError {
                var: "COURSES_BIND_ADDR",
                reason: e.to_string(),
            })?;

        // PORT wins over the port part of the bind address.
        if let Ok(port) = env::var("PORT") {
            let port: u16 = port.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError {
                    var: "PORT",
                    reason: e.to_string(),
                }
            })?;
            bind_addr.set_port(port);
        }

        let log_level = env::var("COURSES_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("COURSES_LOG_FORMAT")
            .map(|f| f.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let allowed_origins = parse_origins(
            &env::var("COURSES_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );

        let request_timeout = match env::var("COURSES_REQUEST_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(secs.trim().parse().map_err(
                |e: std::num::ParseIntError| ConfigError {
                    var: "COURSES_REQUEST_TIMEOUT_SECS",
                    reason: e.to_string(),
                },
            )?),
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            log_json,
            allowed_origins,
            request_timeout,
        })
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
