//! Error types for firstboot.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown flag: {spelling}")]
    UnknownFlag { spelling: String },

    #[error("Unsupported platform: no descriptor matches os-release ID '{id}'")]
    UnsupportedPlatform { id: String },

    #[error("Phase '{phase}' failed: {source}")]
    Phase {
        phase: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Name of the phase that failed, if this error came out of the pipeline.
    pub fn phase(&self) -> Option<&'static str> {
        match self {
            Error::Phase { phase, .. } => Some(phase),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
