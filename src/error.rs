//! Error types for the fallible edges of the panel: persistence, configuration
//! and operator input parsing. The dispatch path itself never fails; rejected
//! operations surface as log entries instead.

use thiserror::Error;

/// Raised when a control key does not name any control on the panel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown control `{0}`")]
pub struct UnknownControl(pub String);

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum ActionParseError {
    #[error("empty command")]
    Empty,

    #[error("command exceeds {0} bytes")]
    TooLong(usize),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),

    #[error("unknown system field `{0}`")]
    UnknownField(String),

    #[error("invalid JSON command: {0}")]
    Json(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("panel runtime has shut down")]
    Closed,
}
