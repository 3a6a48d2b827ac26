//! Crate-wide error type.
//!
//! Grounded in the teacher's `storage::sqlite::StorageError`: a flat,
//! `#[non_exhaustive]` `thiserror` enum at the boundary between SQLite/IO
//! failure modes and the invariant violations the retrieval pipeline treats
//! as fatal (rerank length mismatch, cross-bank link endpoints, negative
//! counts, embedding dimension mismatch).

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Row not found
    #[error("not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An invariant the caller must never be able to violate was violated.
    /// Always fatal, always surfaced — see spec §7.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// Initialization error (platform dirs, missing parent directory, ...)
    #[error("initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
