use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading configuration, resolving specifiers, or parsing.
///
/// Resolution failures never reach the host: the rewriters catch them per
/// specifier and leave the original text in place.
#[derive(Error, Debug)]
pub enum RelimportError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid project manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid options file {path}: {source}")]
    Options {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("no parser registered for `{0}`")]
    UnknownParser(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("cannot resolve `{specifier}`: {reason}")]
    Resolution { specifier: String, reason: String },
}

impl RelimportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RelimportError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelimportError>;
