//! Error types for scs-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or writing project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (template write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}; run `scs init` first")]
    ConfigNotFound { path: PathBuf },

    /// `scs init` would overwrite an existing config.
    #[error("config already exists at {path}; pass --force to overwrite")]
    AlreadyExists { path: PathBuf },

    /// A required field is present but empty.
    #[error("config field `{field}` must not be empty")]
    MissingField { field: &'static str },

    /// No API key in the environment or `.env`.
    #[error("no API key found; set SCS_API_KEY (or API_KEY) in the environment or .env")]
    MissingApiKey,

    /// `.env` exists but could not be parsed.
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
