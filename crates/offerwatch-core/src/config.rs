//! Offerwatch configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OfferwatchError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfferwatchConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl OfferwatchConfig {
    /// Load config from the default path (~/.offerwatch/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OfferwatchError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| OfferwatchError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| OfferwatchError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Offerwatch home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".offerwatch")
    }
}

/// How cycles are triggered.
///
/// `Watch` polls the source file's metadata and runs a cycle only when it
/// changed; `Interval` runs a cycle every period regardless. Exactly one
/// mode is active — configuring both is impossible by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    Watch,
    Interval,
}

/// Candidate data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the candidate CSV file.
    #[serde(default = "default_source_path")]
    pub path: String,
    /// Status value that makes a row eligible. Compared case-insensitively
    /// after trimming.
    #[serde(default = "default_target_status")]
    pub target_status: String,
    #[serde(default = "default_trigger_mode")]
    pub mode: TriggerMode,
    /// Watch mode: seconds between metadata checks.
    /// Interval mode: seconds between cycles.
    #[serde(default = "default_check_secs")]
    pub check_secs: u64,
}

fn default_source_path() -> String {
    "candidates.csv".into()
}
fn default_target_status() -> String {
    "Offered".into()
}
fn default_trigger_mode() -> TriggerMode {
    TriggerMode::Watch
}
fn default_check_secs() -> u64 {
    5
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            target_status: default_target_status(),
            mode: default_trigger_mode(),
            check_secs: default_check_secs(),
        }
    }
}

/// Template store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Path to the role,body template CSV.
    #[serde(default = "default_templates_path")]
    pub path: String,
    /// Fallback for `{location}` when a record has none.
    #[serde(default = "default_company_location")]
    pub company_location: String,
}

fn default_templates_path() -> String {
    "templates.csv".into()
}
fn default_company_location() -> String {
    "Company Location".into()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            path: default_templates_path(),
            company_location: default_company_location(),
        }
    }
}

/// Which transport realization to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Smtp,
    Outbox,
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_transport_kind")]
    pub kind: TransportKind,
    /// Outbox mode: directory that receives one .eml per message.
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: String,
    /// Per-send timeout; a send that exceeds it is recorded as failed.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

fn default_transport_kind() -> TransportKind {
    TransportKind::Smtp
}
fn default_outbox_dir() -> String {
    "~/.offerwatch/outbox".into()
}
fn default_send_timeout_secs() -> u64 {
    30
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            outbox_dir: default_outbox_dir(),
            send_timeout_secs: default_send_timeout_secs(),
            smtp: SmtpConfig::default(),
        }
    }
}

/// SMTP relay configuration (STARTTLS submission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// From address; falls back to `username` when empty.
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            display_name: None,
        }
    }
}

impl SmtpConfig {
    /// Effective From address.
    pub fn sender(&self) -> &str {
        if self.from_email.is_empty() {
            &self.username
        } else {
            &self.from_email
        }
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database path.
    #[serde(default = "default_ledger_db")]
    pub db_path: String,
    /// Directory for per-run CSV exports.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

fn default_ledger_db() -> String {
    "~/.offerwatch/ledger.db".into()
}
fn default_export_dir() -> String {
    "~/.offerwatch/exports".into()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: default_ledger_db(),
            export_dir: default_export_dir(),
        }
    }
}
