//! Errors raised while loading roster configuration

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("cannot write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// Not valid TOML, or a section has the wrong shape
    #[error("malformed configuration in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("cannot render configuration as TOML: {0}")]
    Render(String),

    /// A `ROSTER_*` environment override could not be parsed
    #[error("bad override {key}={value}: {reason}")]
    Override {
        key: String,
        value: String,
        reason: String,
    },

    /// A limit that must be positive was zero
    #[error("{0} must be greater than 0")]
    ZeroLimit(&'static str),

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),
}

impl ConfigError {
    /// Whether the error came from the filesystem rather than the values
    pub fn is_io(&self) -> bool {
        matches!(self, ConfigError::Read { .. } | ConfigError::Write { .. })
    }
}
