//! Error taxonomy for the autokill policy.

/// A severity name that is not one of the five canonical results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown result severity: {0}")]
pub struct UnknownSeverity(pub String);

/// A machine-name pattern that failed to compile.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid machine pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Errors from persisting or loading policy settings.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by policy reconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum AutokillError {
    /// The supplied pattern does not compile; the policy was left unchanged.
    #[error("configuration rejected: {0}")]
    Configuration(#[from] PatternError),

    /// The new settings could not be persisted; the policy was left unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for autokill operations.
pub type Result<T> = std::result::Result<T, AutokillError>;
