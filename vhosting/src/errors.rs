use crate::path_key::FormatError;
use std::fmt;

/// Result type alias for request-time operations
pub type Result<T, E = RequestError> = std::result::Result<T, E>;

/// Which index of a virtual host a duplicate rewrite collided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteKey {
    /// Two rules claim the same external path.
    External,
    /// Two rules rewrite to the same internal path.
    Internal,
}

impl fmt::Display for RewriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteKey::External => f.write_str("url"),
            RewriteKey::Internal => f.write_str("path"),
        }
    }
}

/// Errors raised while building or changing the configuration. Any of them
/// rejects the whole change and keeps the previous configuration active.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid url or path: {0}")]
    Format(#[from] FormatError),

    #[error("invalid rewrite path {rewrite} in {host}")]
    InvalidPath { host: String, rewrite: String },

    #[error("duplicate {kind} entry for {path} in {host}")]
    DuplicateRewrite {
        host: String,
        kind: RewriteKey,
        path: String,
    },

    #[error("double entry for host {0}")]
    DuplicateHost(String),

    #[error("invalid number of options at line {line}: expected 5, got {columns}")]
    InvalidCsvRow { line: usize, columns: usize },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("advanced virtual hosting is already active")]
    AlreadyActive,

    #[error("advanced virtual hosting is not active")]
    NotActive,
}

/// Errors local to a single request. They never touch the registry.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RequestError {
    #[error("invalid url: {0}")]
    Format(#[from] FormatError),

    #[error("unroutable request: {0}")]
    Unroutable(String),
}
