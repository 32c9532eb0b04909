use std::path::PathBuf;
use thiserror::Error;

/// Typed errors for artifact scanning and extraction.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive extraction failed: {message}")]
    ArchiveExtraction { message: String },

    #[error("Archive extraction would exceed limits: {violation}")]
    ArchiveLimitsExceeded { violation: String },

    #[error("Entry too large: {size} bytes exceeds limit of {limit} bytes")]
    EntryTooLarge { size: u64, limit: u64 },

    #[error("Invalid path: {path} - {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Directory traversal attempt detected: {path}")]
    DirectoryTraversal { path: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    pub fn archive_extraction<S: Into<String>>(message: S) -> Self {
        Self::ArchiveExtraction { message: message.into() }
    }

    pub fn archive_limits_exceeded<S: Into<String>>(violation: S) -> Self {
        Self::ArchiveLimitsExceeded { violation: violation.into() }
    }

    pub fn entry_too_large(size: u64, limit: u64) -> Self {
        Self::EntryTooLarge { size, limit }
    }

    pub fn invalid_path<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::InvalidPath { path: path.into(), reason: reason.into() }
    }

    pub fn path_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn directory_traversal<S: Into<String>>(path: S) -> Self {
        Self::DirectoryTraversal { path: path.into() }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Returns true if the error is recoverable and analysis of sibling
    /// files can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EntryTooLarge { .. }
                | Self::InvalidPath { .. }
                | Self::DirectoryTraversal { .. }
                | Self::ArchiveLimitsExceeded { .. }
        )
    }
}
