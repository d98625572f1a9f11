//! Daemon configuration with TOML file support.

use idgate_types::VerificationParams;
use idgate_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error("cannot serialize config: {0}")]
    Serialize(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration for the daemon.
///
/// Loaded from a TOML file via [`DaemonConfig::from_toml_file`] or built
/// programmatically. CLI flags and environment variables are applied on top
/// with [`DaemonConfig::with_overrides`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How often idle liveness sessions are swept.
    #[serde(default = "default_session_purge_interval_secs")]
    pub session_purge_interval_secs: u64,

    #[serde(default)]
    pub verification: VerificationParams,
}

/// Values supplied on the command line or through `IDGATE_*` variables.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub listen_addr: Option<String>,
    pub port: Option<u16>,
    pub log_format: Option<LogFormat>,
    pub log_level: Option<String>,
    pub face_match_threshold: Option<f64>,
    pub strict_retries: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7090
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_purge_interval_secs() -> u64 {
    60
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(addr) = overrides.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(format) = overrides.log_format {
            self.log_format = format;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(threshold) = overrides.face_match_threshold {
            self.verification.face_match_threshold = threshold;
        }
        if overrides.strict_retries {
            let strict = VerificationParams::strict();
            self.verification.max_face_attempts = strict.max_face_attempts;
            self.verification.max_liveness_failures_per_action =
                strict.max_liveness_failures_per_action;
        }
        self
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let params = &self.verification;
        if !(0.0..=1.0).contains(&params.face_match_threshold) {
            return Err(ConfigError::Invalid {
                field: "verification.face_match_threshold",
                reason: format!("{} is outside [0, 1]", params.face_match_threshold),
            });
        }
        if params.liveness_session_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "verification.liveness_session_ttl_secs",
                reason: "must be positive".into(),
            });
        }
        if params.max_face_attempts == Some(0) {
            return Err(ConfigError::Invalid {
                field: "verification.max_face_attempts",
                reason: "must be positive when set".into(),
            });
        }
        if params.max_liveness_failures_per_action == Some(0) {
            return Err(ConfigError::Invalid {
                field: "verification.max_liveness_failures_per_action",
                reason: "must be positive when set".into(),
            });
        }
        if self.session_purge_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session_purge_interval_secs",
                reason: "must be positive".into(),
            });
        }
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.listen_addr.parse().map_err(|_| ConfigError::Invalid {
            field: "listen_addr",
            reason: format!("{:?} is not an IP address", self.listen_addr),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            session_purge_interval_secs: default_session_purge_interval_secs(),
            verification: VerificationParams::default(),
        }
    }
}
