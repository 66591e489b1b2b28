use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum HuntError {
    #[error("{0}")]
    Usage(String),

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("invalid hunt name '{0}' (must be a single path component)")]
    InvalidHuntName(String),

    #[error("treasure with ID {id} already exists in hunt {hunt}")]
    DuplicateId { hunt: String, id: String },

    #[error("treasure with ID {id} not found in hunt {hunt}")]
    TreasureNotFound { hunt: String, id: String },

    #[error("hunt {0} not found")]
    HuntNotFound(String),

    #[error("hunts directory {0} does not exist")]
    HuntsRootMissing(String),

    #[error("{0} exists but is not a directory")]
    NotADirectory(String),

    #[error(
        "treasure {id} was stored in hunt {hunt} but the audit log write failed: {source}"
    )]
    AuditLogDiverged {
        hunt: String,
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("locked by another process: {0}")]
    Locked(String),

    #[error("monitor is not running")]
    MonitorNotRunning,

    #[error("failed to spawn monitor: {0}")]
    MonitorSpawn(#[source] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HuntError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "usage",
            Self::InvalidField { .. } => "invalid_field",
            Self::InvalidHuntName(_) => "invalid_hunt_name",
            Self::DuplicateId { .. } => "duplicate_id",
            Self::TreasureNotFound { .. } => "treasure_not_found",
            Self::HuntNotFound(_) => "hunt_not_found",
            Self::HuntsRootMissing(_) => "hunts_root_missing",
            Self::NotADirectory(_) => "not_a_directory",
            Self::AuditLogDiverged { .. } => "audit_log_diverged",
            Self::Locked(_) => "locked",
            Self::MonitorNotRunning => "monitor_not_running",
            Self::MonitorSpawn(_) => "monitor_spawn",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// True for failures a caller should treat as "nothing there" rather than
    /// a broken store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TreasureNotFound { .. } | Self::HuntNotFound(_) | Self::HuntsRootMissing(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HuntError>;
