// ============================================================================
// repostproof-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the External Media Engine
//
// This module encapsulates every interaction with the external ffmpeg
// binary: randomized command construction, a narrow runner trait for
// executing argument vectors, and startup dependency checking.
//
// DESIGN PHILOSOPHY:
// The runner is a trait so consumers can inject their own implementations
// for testing or specialized behavior. The default implementation uses the
// ffmpeg-sidecar crate.

use crate::error::{command_start_error, CoreError, CoreResult};

use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Randomized ffmpeg argument building and filter-graph assembly
pub mod ffmpeg;

/// Trait and implementations for executing ffmpeg argument vectors
pub mod ffmpeg_executor;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg::{
    assemble_invocation, build_invocation, EngineInvocation, FilterParameters,
};
pub use ffmpeg_executor::{supports_filter, EngineOutput, FfmpegRunner, SidecarRunner};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks if a required external command is available and executable.
///
/// Runs `<cmd_name> -version` and discards the output; only the ability to
/// start the process matters. Used at server startup to warn early when
/// ffmpeg is missing rather than failing the first upload.
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd_name);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(command_start_error(cmd_name, e))
        }
    }
}
