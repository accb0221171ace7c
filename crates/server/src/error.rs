use std::path::PathBuf;

use thiserror::Error;

/// Fatal at startup: the process must not bind a listener or accept
/// traffic with an invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0} as TOML")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Malformed or unrecognized client request. Adapter-level: never reaches
/// `ramdb-store`, since a rejected request never becomes a `Command`.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    #[error("parse error: {raw}")]
    Parse {
        /// The offending raw input, truncated to 120 bytes — diagnostic
        /// only, never echoed beyond what the client itself already sent.
        raw: String,
    },

    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

impl ProtocolError {
    pub fn parse(raw: &str) -> Self {
        let truncated: String = raw.chars().take(120).collect();
        ProtocolError::Parse { raw: truncated }
    }
}
