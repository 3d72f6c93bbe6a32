// ============================================================================
// repostproof-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: Core Configuration Structure and Constants
//
// This module defines the configuration used throughout the repostproof-core
// library: where scratch files live, the threshold above which outputs are
// returned as download links instead of inline bytes, and how long stored
// outputs are retained before the age-based sweep removes them.
//
// USAGE:
// Instances of CoreConfig are created by consumers of the library (like
// repostproof-server) and passed to process_upload and sweep routines. The
// scratch directory is owned by process startup, not by import-time side
// effects.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

// ============================================================================
// DEFAULT CONSTANTS
// ============================================================================

/// Outputs smaller than this are returned inline as the response body;
/// anything at or above is left in scratch storage behind a download link.
pub const DEFAULT_INLINE_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

/// How long stored outputs survive before the age-based sweep removes them.
/// Must stay comfortably longer than the slowest plausible request so a
/// sweep triggered by one request can never reap another request's pending
/// output.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// CORE CONFIGURATION
// ============================================================================

/// Main configuration structure for the repostproof-core library.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Directory holding transient input/output files
    pub scratch_dir: PathBuf,

    /// Size threshold (bytes) separating inline responses from stored ones
    pub inline_limit_bytes: u64,

    /// Age threshold for the stored-output sweep
    pub retention: Duration,
}

impl CoreConfig {
    /// Creates a configuration rooted at `scratch_dir` with default limits.
    pub fn new(scratch_dir: PathBuf) -> Self {
        Self {
            scratch_dir,
            inline_limit_bytes: DEFAULT_INLINE_LIMIT_BYTES,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Validates the configuration, returning `CoreError::Config` on bad values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("scratch_dir must not be empty".to_string()));
        }
        if self.inline_limit_bytes == 0 {
            return Err(CoreError::Config(
                "inline_limit_bytes must be positive".to_string(),
            ));
        }
        if self.retention < Duration::from_secs(60) {
            return Err(CoreError::Config(
                "retention below one minute risks reaping in-flight outputs".to_string(),
            ));
        }
        Ok(())
    }
}
