use crate::error::{Result, ScanError};

/// Security and performance limits for archive handling
pub const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024; // 100MB
pub const MAX_ARCHIVE_ENTRIES: usize = 10_000;
pub const MAX_ARCHIVE_TOTAL_SIZE: u64 = 1_024 * 1024 * 1024; // 1GB

/// Upper bound on files examined per tier when searching an unpacked
/// archive for IFlow definition files.
pub const DEFINITION_SCAN_BUDGET: usize = 50;

/// Number of leading bytes sampled when sniffing file content.
pub const SNIFF_SAMPLE_LEN: usize = 1000;

/// Configuration for archive extraction with security limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of entries extracted from an archive
    pub max_entries: usize,
    /// Maximum total size of all extracted entries combined
    pub max_total_size: u64,
    /// Maximum size of any individual entry
    pub max_entry_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: MAX_ARCHIVE_ENTRIES,
            max_total_size: MAX_ARCHIVE_TOTAL_SIZE,
            max_entry_size: MAX_ENTRY_SIZE,
        }
    }
}

impl ArchiveLimits {
    /// Create new archive limits with validation
    pub fn new(max_entries: usize, max_total_size: u64, max_entry_size: u64) -> Result<Self> {
        if max_entries == 0 {
            return Err(ScanError::configuration("max_entries must be greater than 0"));
        }
        if max_total_size == 0 {
            return Err(ScanError::configuration("max_total_size must be greater than 0"));
        }
        if max_entry_size == 0 {
            return Err(ScanError::configuration("max_entry_size must be greater than 0"));
        }

        Ok(Self { max_entries, max_total_size, max_entry_size })
    }

    /// Check if current extraction state violates limits
    pub fn check_limits(&self, entries_extracted: usize, total_size_extracted: u64) -> Result<()> {
        if entries_extracted >= self.max_entries {
            return Err(ScanError::archive_limits_exceeded(format!(
                "too many entries: {} >= {}",
                entries_extracted, self.max_entries
            )));
        }

        if total_size_extracted >= self.max_total_size {
            return Err(ScanError::archive_limits_exceeded(format!(
                "total size too large: {} >= {} bytes",
                total_size_extracted, self.max_total_size
            )));
        }

        Ok(())
    }
}

/// Options for artifact analysis
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Treat external-endpoint patterns with no detected authentication as a
    /// compliance violation. Heuristic: documentation-only URL mentions can
    /// trip it.
    pub flag_unauthenticated_endpoints: bool,
    /// Limits applied while unpacking artifact archives
    pub archive_limits: ArchiveLimits,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            flag_unauthenticated_endpoints: true,
            archive_limits: ArchiveLimits::default(),
        }
    }
}

impl ScanOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the missing-authentication endpoint policy
    #[must_use]
    pub fn lenient_endpoints(mut self) -> Self {
        self.flag_unauthenticated_endpoints = false;
        self
    }

    /// Replace the default archive limits
    #[must_use]
    pub fn with_archive_limits(mut self, limits: ArchiveLimits) -> Self {
        self.archive_limits = limits;
        self
    }
}
