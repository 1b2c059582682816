use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VsmError {
    /// Input collection or output listing could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A tagger, lemmatizer, or stop-word resource is missing or malformed.
    #[error("resource {path} unusable: {reason}")]
    Resource { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("relevance judgments line {line}: {reason}")]
    Qrels { line: usize, reason: String },
    #[error("run listing line {line}: {reason}")]
    Run { line: usize, reason: String },
}

impl VsmError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn resource(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Resource { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, VsmError>;
