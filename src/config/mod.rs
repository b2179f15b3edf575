//! Configuration management
//!
//! This module provides YAML-based configuration management with support for:
//! - Environment variable overrides
//! - Multiple configuration file locations
//! - Default values for all settings
//! - Per-entity timeline profiles (field labels, hidden fields, child sources)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::models::Decoration;
use crate::services::grouping::{GroupingOptions, DEFAULT_GROUPING_WINDOW_MS};
use crate::utils::validation::validate_identifier;

/// Largest UTC offset accepted for calendar-day bounds (±14h)
const MAX_UTC_OFFSET_MINUTES: u32 = 14 * 60;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    /// Timeline profiles keyed by entity type
    #[serde(default)]
    pub entities: BTreeMap<String, EntityProfile>,
}

/// Remote audit store connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    /// Sent as both the `apikey` header and the bearer token
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:54321".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log output target (console or file)
    #[serde(default = "default_log_target")]
    pub target: LogTarget,
    /// Directory for log files (used when target is "file")
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Log file name prefix (default: "dossier-audit")
    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,
    /// Enable daily log rotation
    #[serde(default = "default_log_rotation")]
    pub daily_rotation: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            target: default_log_target(),
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            daily_rotation: default_log_rotation(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Log output target
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stderr
    #[default]
    Console,
    /// Log to file with optional rotation
    File,
    /// Log to both console and file
    Both,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_log_target() -> LogTarget {
    LogTarget::Console
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_log_prefix() -> String {
    "dossier-audit".to_string()
}

fn default_log_rotation() -> bool {
    true
}

/// Engine-wide timeline defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineConfig {
    #[serde(default = "default_grouping_enabled")]
    pub grouping_enabled: bool,
    #[serde(default = "default_grouping_window_ms")]
    pub grouping_window_ms: u64,
    #[serde(default = "default_yes_token")]
    pub yes_token: String,
    #[serde(default = "default_no_token")]
    pub no_token: String,
    /// Rendered for null or missing values
    #[serde(default = "default_empty_value")]
    pub empty_value: String,
    /// Offset used to turn calendar-day filters into instants
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            grouping_enabled: default_grouping_enabled(),
            grouping_window_ms: default_grouping_window_ms(),
            yes_token: default_yes_token(),
            no_token: default_no_token(),
            empty_value: default_empty_value(),
            utc_offset_minutes: 0,
        }
    }
}

impl TimelineConfig {
    pub fn grouping(&self) -> GroupingOptions {
        GroupingOptions {
            enabled: self.grouping_enabled,
            window_ms: self.grouping_window_ms,
        }
    }
}

fn default_grouping_enabled() -> bool {
    true
}

fn default_grouping_window_ms() -> u64 {
    DEFAULT_GROUPING_WINDOW_MS
}

fn default_yes_token() -> String {
    "Sí".to_string()
}

fn default_no_token() -> String {
    "No".to_string()
}

fn default_empty_value() -> String {
    "N/A".to_string()
}

/// Timeline profile of one entity type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntityProfile {
    /// Audit table holding this entity's history
    pub table: String,
    /// Column linking audit rows to the parent entity
    #[serde(default = "default_parent_column")]
    pub parent_column: String,
    #[serde(default)]
    pub field_labels: HashMap<String, String>,
    #[serde(default)]
    pub hidden_fields: Vec<String>,
    /// Label overrides keyed by action tag
    #[serde(default)]
    pub action_labels: HashMap<String, String>,
    #[serde(default)]
    pub grouping_enabled: Option<bool>,
    #[serde(default)]
    pub grouping_window_ms: Option<u64>,
    /// Badge for the entity's own rows in a unified timeline
    #[serde(default)]
    pub badge: Option<Decoration>,
    /// Child list-item histories merged into this entity's timeline
    #[serde(default)]
    pub children: Vec<ChildSource>,
}

/// Child record kind merged into a parent's timeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChildSource {
    pub table: String,
    #[serde(default = "default_parent_column")]
    pub parent_column: String,
    pub badge: Decoration,
}

fn default_parent_column() -> String {
    "record_id".to_string()
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values
    /// 2. Configuration file (YAML)
    /// 3. Environment variables (prefixed with DOSSIER_)
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("DOSSIER_AUDIT_CONFIG")
            .map(PathBuf::from)
            .ok()
            .or_else(Self::find_config_file);

        let mut config = match config_path {
            Some(ref path) if path.exists() => Self::from_file(path)?,
            Some(ref path) => {
                eprintln!("[CONFIG] Config file not found: {:?}, using defaults", path);
                AppConfig::default()
            }
            None => AppConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parse a YAML configuration file without env overrides
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_norway::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Find the configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            // Current directory
            PathBuf::from("config.yaml"),
            PathBuf::from("config/config.yaml"),
            // System config directory
            PathBuf::from("/etc/dossier-audit/config.yaml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("dossier-audit/config.yaml"))
                .unwrap_or_default(),
        ];

        paths.into_iter().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Store overrides
        if let Ok(url) = std::env::var("DOSSIER_STORE_URL") {
            self.store.url = url;
        }
        if let Ok(key) = std::env::var("DOSSIER_STORE_API_KEY") {
            self.store.api_key = Some(key).filter(|k| !k.is_empty());
        }

        // Logging overrides
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("DOSSIER_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&format);
        }

        // Timeline overrides
        if let Ok(window) = std::env::var("DOSSIER_GROUPING_WINDOW_MS") {
            if let Ok(ms) = window.parse() {
                self.timeline.grouping_window_ms = ms;
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.store.url.is_empty() {
            anyhow::bail!("Store URL cannot be empty");
        }

        if self.timeline.grouping_window_ms == 0 {
            anyhow::bail!("Grouping window must be greater than 0 ms");
        }

        if self.timeline.utc_offset_minutes.unsigned_abs() > MAX_UTC_OFFSET_MINUTES {
            anyhow::bail!(
                "Invalid UTC offset: {} minutes. Must be within ±{}",
                self.timeline.utc_offset_minutes,
                MAX_UTC_OFFSET_MINUTES
            );
        }

        for (entity_type, profile) in &self.entities {
            if profile.grouping_window_ms == Some(0) {
                anyhow::bail!("Grouping window for '{}' must be greater than 0 ms", entity_type);
            }
            let tables = std::iter::once((&profile.table, &profile.parent_column)).chain(
                profile
                    .children
                    .iter()
                    .map(|child| (&child.table, &child.parent_column)),
            );
            for (table, column) in tables {
                if !validate_identifier(table) || !validate_identifier(column) {
                    anyhow::bail!(
                        "Invalid audit table reference for '{}': {}.{}",
                        entity_type,
                        table,
                        column
                    );
                }
            }
        }

        Ok(())
    }

    pub fn entity(&self, entity_type: &str) -> Option<&EntityProfile> {
        self.entities.get(entity_type)
    }

    /// Create a default configuration file
    pub fn create_default_config(path: &PathBuf) -> Result<()> {
        let config = AppConfig::default();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_norway::to_string(&config)?;
        std::fs::write(path, yaml)?;

        Ok(())
    }
}
