//! Error types for cineorg.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cineorg.
///
/// Variants are organized by the pipeline stage that raises them. Per-item
/// failures inside a batch (scan, import, transfer, cleanup) are NOT meant to
/// propagate as this type — they are captured into [`crate::core::batch::ItemOutcome`]
/// instead, so a long-running batch always completes. This type is for
/// conditions that abort a single operation or the whole process.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration / startup
    #[error("configuration error: {0}")]
    Config(String),

    #[error("managed directory missing: {0}")]
    ManagedDirectoryMissing(PathBuf),

    #[error("catalog API key not configured for {0}; that catalog is disabled")]
    CatalogKeyMissing(String),

    // Filesystem errors
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("file already exists: {0}")]
    FileAlreadyExists(PathBuf),

    // Parse errors
    #[error("failed to parse filename {0:?}")]
    ParseError(String),

    // Media probe
    #[error("media probe failed for {0:?}: {1}")]
    ProbeFailed(PathBuf, String),

    // Catalog errors
    #[error("transient catalog failure: {0}")]
    CatalogTransient(String),

    #[error("catalog search failed: {0}")]
    CatalogSearchError(String),

    // Validation
    #[error("no such pending validation: {0}")]
    PendingValidationNotFound(String),

    #[error("candidate {0} is not among the pending validation's candidates")]
    CandidateNotFound(String),

    // Transfer
    #[error("hash failed for {0:?}: {1}")]
    HashFailure(PathBuf, String),

    #[error("atomic move failed from {0:?} to {1:?}: {2}")]
    MoveFailed(PathBuf, PathBuf, String),

    #[error("symlink creation failed at {0:?}: {1}")]
    SymlinkFailed(PathBuf, String),

    #[error("conflict at destination {0:?}")]
    Conflict(Box<crate::core::transferer::ConflictInfo>),

    // Cleanup
    #[error("subdivision destination exists as a regular file: {0:?}")]
    SubdivisionDestinationIsFile(PathBuf),

    #[error("repair candidate ambiguous for {0:?}")]
    RepairCandidateAmbiguous(PathBuf),

    // Persistence
    #[error("database error: {0}")]
    Database(String),

    // IO / HTTP / JSON passthrough
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Map this error to the process exit code defined by spec §6:
    /// 0 success (not represented here), 1 user-visible error, 2 unrecoverable internal failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::ManagedDirectoryMissing(_)
            | Error::PathNotFound(_)
            | Error::NotADirectory(_)
            | Error::PermissionDenied(_)
            | Error::FileAlreadyExists(_)
            | Error::CatalogKeyMissing(_) => 1,
            _ => 2,
        }
    }
}
