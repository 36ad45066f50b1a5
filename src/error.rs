use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Player name '{name}' contains the legacy record delimiter '}}'")]
    LegacyDelimiter { name: String },

    #[error("Unreadable legacy player record {record:?}")]
    LegacyRecord { record: String },

    #[error("Player not found: {key}")]
    PlayerNotFound { key: String },

    // Wire errors
    #[error("Malformed grant notice: {message}")]
    MalformedNotice { message: String },

    // Host errors
    #[error("Host error: {message}")]
    Host { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RewardError {
    pub fn host(message: impl Into<String>) -> Self {
        RewardError::Host {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for RewardError {
    fn from(err: std::io::Error) -> Self {
        RewardError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RewardError {
    fn from(err: serde_json::Error) -> Self {
        RewardError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RewardError>;
