//! Core library for the repostproof randomized re-encoding service.
//!
//! This crate holds everything below the HTTP surface: randomized ffmpeg
//! command construction, the narrow engine client used to run it, scratch
//! file lifecycle, and the per-upload processing flow.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use repostproof_core::{process_upload, CoreConfig, SidecarRunner};
//! use std::path::PathBuf;
//!
//! let config = CoreConfig::new(PathBuf::from("/tmp/repostproof"));
//! config.validate().unwrap();
//!
//! let runner = SidecarRunner;
//! let upload: Vec<u8> = std::fs::read("input.mp4").unwrap();
//! let outcome = process_upload(&runner, &config, &upload).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod external;
pub mod processing;
pub mod temp_files;

// Re-exports for public API
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use external::{
    assemble_invocation, build_invocation, check_dependency, supports_filter, EngineInvocation,
    EngineOutput, FfmpegRunner, FilterParameters, SidecarRunner,
};
pub use processing::{process_upload, ProcessOutcome};
pub use temp_files::{create_scratch_file_path, scratch_token, sweep_older_than, ScratchGuard};
