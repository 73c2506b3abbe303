//! Configuration loading and resolution
//!
//! Settings resolve through a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`BLOOM_*`)
//! 3. TOML config file
//! 4. Compiled per-OS default (fallback)
//!
//! A missing or unreadable config file never aborts startup; the resolver
//! logs a warning and continues with defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default listen port for bloom-api
pub const DEFAULT_PORT: u16 = 5850;

/// Default deadline after which non-terminal async records are swept to failed
pub const DEFAULT_STUCK_RECORD_DEADLINE_MINUTES: i64 = 30;

/// Compiled platform defaults, the lowest-priority configuration source.
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub data_dir: PathBuf,
    pub bind: String,
    pub port: u16,
    pub log_filter: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("bloom"))
            .unwrap_or_else(|| PathBuf::from("./bloom_data"));

        Self {
            data_dir,
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            log_filter: "info".to_string(),
        }
    }
}

/// Raw TOML config file contents. Every field is optional; absent fields
/// fall through to the next priority level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub stripe_secret_key: Option<String>,
    pub assistant_url: Option<String>,
    pub stuck_record_deadline_minutes: Option<i64>,
    pub log_filter: Option<String>,
}

impl TomlConfig {
    /// Load a TOML config file. Missing file yields `Default`; a malformed
    /// file is reported and treated as missing rather than aborting startup.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };

        match toml::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring malformed config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Locate the config file: `BLOOM_CONFIG` env override, then the user
    /// config directory, then the system-wide path.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("BLOOM_CONFIG") {
            return Some(PathBuf::from(path));
        }

        let user_config = dirs::config_dir().map(|d| d.join("bloom").join("config.toml"));
        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }

        let system_config = PathBuf::from("/etc/bloom/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }

        user_config
    }
}

/// Command-line overrides, filled in by the binary's clap parser.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind: String,
    pub port: u16,
    pub stripe_secret_key: Option<String>,
    pub assistant_url: Option<String>,
    pub stuck_record_deadline_minutes: i64,
    pub log_filter: String,
}

impl ServiceConfig {
    /// Resolve configuration through the full priority chain.
    pub fn resolve(cli: CliOverrides) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let file = TomlConfig::default_path()
            .map(|p| TomlConfig::load(&p))
            .unwrap_or_default();

        let database_path = cli
            .database_path
            .or_else(|| std::env::var("BLOOM_DATABASE_PATH").ok().map(PathBuf::from))
            .or(file.database_path)
            .unwrap_or_else(|| defaults.data_dir.join("bloom.db"));

        let bind = cli
            .bind
            .or_else(|| std::env::var("BLOOM_BIND").ok())
            .or(file.bind)
            .unwrap_or(defaults.bind);

        let port = cli
            .port
            .or_else(|| {
                std::env::var("BLOOM_PORT")
                    .ok()
                    .and_then(|raw| raw.parse().ok())
            })
            .or(file.port)
            .unwrap_or(defaults.port);

        let stripe_secret_key = std::env::var("BLOOM_STRIPE_SECRET_KEY")
            .ok()
            .or(file.stripe_secret_key);

        let assistant_url = std::env::var("BLOOM_ASSISTANT_URL")
            .ok()
            .or(file.assistant_url);

        let stuck_record_deadline_minutes = std::env::var("BLOOM_STUCK_RECORD_DEADLINE_MINUTES")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .or(file.stuck_record_deadline_minutes)
            .unwrap_or(DEFAULT_STUCK_RECORD_DEADLINE_MINUTES);

        let log_filter = std::env::var("BLOOM_LOG")
            .ok()
            .or(file.log_filter)
            .unwrap_or(defaults.log_filter);

        Self {
            database_path,
            bind,
            port,
            stripe_secret_key,
            assistant_url,
            stuck_record_deadline_minutes,
            log_filter,
        }
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Ensure the database's parent directory exists.
    pub fn ensure_data_dir(&self) -> crate::Result<()> {
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
