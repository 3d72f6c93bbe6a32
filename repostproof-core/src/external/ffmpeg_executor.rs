//! FFmpeg process execution abstraction.
//!
//! The engine is an opaque collaborator reached through one narrow
//! operation: run an argument vector, get back the exit status and the
//! captured diagnostic stream. Keeping that seam behind a trait lets the
//! server hold a `dyn FfmpegRunner` and lets tests substitute a mock
//! without invoking a real binary.

use crate::error::{command_start_error, command_wait_error, CoreResult};

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::process::{Command, ExitStatus, Stdio};

/// Result of one engine invocation: exit status plus captured diagnostics.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub status: ExitStatus,
    pub stderr: String,
}

/// Narrow client interface to the external media engine.
///
/// `run` blocks until the subprocess exits; there is no timeout and no
/// cancellation, matching the engine's own termination semantics.
pub trait FfmpegRunner {
    /// Executes the engine with `args` (program name excluded) and returns
    /// its exit status and diagnostic text.
    fn run(&self, args: &[String]) -> CoreResult<EngineOutput>;

    /// Returns the engine's filter listing (`ffmpeg -filters`) for
    /// capability probing.
    fn query_filters(&self) -> CoreResult<String>;
}

/// Reports whether the installed engine exposes the named filter.
///
/// Probe failure is capability absence, never a hard error: callers fall
/// back to a lower-quality approximation.
pub fn supports_filter<R: FfmpegRunner + ?Sized>(runner: &R, name: &str) -> bool {
    match runner.query_filters() {
        Ok(listing) => listing.contains(name),
        Err(e) => {
            log::warn!("Filter capability probe failed, assuming '{}' absent: {}", name, e);
            false
        }
    }
}

/// Concrete `FfmpegRunner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarRunner;

impl FfmpegRunner for SidecarRunner {
    fn run(&self, args: &[String]) -> CoreResult<EngineOutput> {
        let mut cmd = FfmpegCommand::new();
        for arg in args {
            cmd.arg(arg);
        }

        log::debug!("Running ffmpeg with args: {:?}", args);

        let mut child = cmd.spawn().map_err(|e| command_start_error("ffmpeg", e))?;

        // Collect the log/error stream for failure reporting.
        let mut stderr = String::new();
        let iterator = child
            .iter()
            .map_err(|e| command_start_error("ffmpeg (event iterator)", e))?;
        for event in iterator {
            match event {
                FfmpegEvent::Log(_, line) | FfmpegEvent::Error(line) => {
                    stderr.push_str(&line);
                    stderr.push('\n');
                }
                _ => {}
            }
        }

        let status = child.wait().map_err(|e| command_wait_error("ffmpeg", e))?;
        Ok(EngineOutput { status, stderr })
    }

    fn query_filters(&self) -> CoreResult<String> {
        let output = Command::new("ffmpeg")
            .arg("-filters")
            .stderr(Stdio::null())
            .output()
            .map_err(|e| command_start_error("ffmpeg -filters", e))?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
