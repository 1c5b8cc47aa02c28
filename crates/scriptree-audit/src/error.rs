//! Audit errors

/// Errors raised by audit sinks
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Sink refused or failed to store the entry
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    /// Entry could not be serialized for hashing
    #[error("audit entry encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Hash chain broken at the given position
    #[error("audit chain integrity violated at entry {index}")]
    IntegrityViolation {
        /// Position of the first bad entry
        index: usize,
    },
}
