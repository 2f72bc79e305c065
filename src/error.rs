//! Error types for parsing stored records and loading configuration

use std::path::PathBuf;

use thiserror::Error;

/// A stored or imported value could not be turned into a record field
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
}

impl ParseError {
    pub fn unknown(kind: &'static str, value: &str) -> Self {
        ParseError::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config syntax")]
    Toml(#[from] toml::de::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}
