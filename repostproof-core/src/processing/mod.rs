//! Upload processing orchestration.
//!
//! One call per uploaded file: persist the bytes to scratch storage, build
//! a randomized engine invocation, run it synchronously, and decide whether
//! the result goes back inline or stays on disk behind a download link.
//! The input copy (and any per-call lookup table) is removed on every exit
//! path, success or failure.

use crate::config::CoreConfig;
use crate::error::{command_failed_error, CoreError, CoreResult};
use crate::external::ffmpeg::build_invocation;
use crate::external::ffmpeg_executor::FfmpegRunner;
use crate::temp_files::{self, ScratchGuard};

use log::{error, info};

use std::fs;

/// Outcome of a successfully processed upload.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Output was small enough to return as the response body. The scratch
    /// copy has already been removed.
    Inline {
        data: Vec<u8>,
        download_name: String,
        size_bytes: u64,
        pitch_preserved: bool,
        command_line: String,
    },
    /// Output stays in scratch storage for later retrieval by filename.
    Stored {
        filename: String,
        size_mb: f64,
        pitch_preserved: bool,
        command_line: String,
    },
}

/// Processes one uploaded file through the external engine.
///
/// Blocks until the engine exits. A non-zero exit status is returned as
/// `CoreError::CommandFailed` carrying the captured diagnostic stream; the
/// input scratch copy is removed whichever way this function leaves.
pub fn process_upload<R: FfmpegRunner + ?Sized>(
    runner: &R,
    config: &CoreConfig,
    data: &[u8],
) -> CoreResult<ProcessOutcome> {
    fs::create_dir_all(&config.scratch_dir)?;

    let token = temp_files::scratch_token();
    let input_path = config.scratch_dir.join(format!("in_{token}.mp4"));
    let output_path = config.scratch_dir.join(format!("out_{token}.mp4"));

    fs::write(&input_path, data)?;
    let input_guard = ScratchGuard::new(input_path.clone());

    let (invocation, lut_path) = build_invocation(
        runner,
        &mut rand::thread_rng(),
        &input_path,
        &output_path,
        &config.scratch_dir,
    );
    let _lut_guard = lut_path.map(ScratchGuard::new);

    let engine = runner.run(&invocation.args)?;
    if !engine.status.success() {
        error!(
            "Engine invocation failed ({}): {}",
            engine.status,
            engine.stderr.trim()
        );
        return Err(command_failed_error("ffmpeg", engine.status, engine.stderr));
    }

    let size_bytes = fs::metadata(&output_path)
        .map_err(|_| CoreError::OutputMissing(output_path.display().to_string()))?
        .len();
    let size_mb = (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
    info!(
        "Engine invocation succeeded: {} ({size_mb} MiB, pitch preserved: {})",
        output_path.display(),
        invocation.pitch_preserved
    );

    // Input cleanup is owned by the guard; make the intent explicit here.
    drop(input_guard);

    if size_bytes < config.inline_limit_bytes {
        let data = fs::read(&output_path)?;
        // Inline outputs are owned by this request alone; remove eagerly
        // instead of waiting for the age sweep.
        let _served = ScratchGuard::new(output_path);
        Ok(ProcessOutcome::Inline {
            data,
            download_name: download_name(),
            size_bytes,
            pitch_preserved: invocation.pitch_preserved,
            command_line: invocation.command_line(),
        })
    } else {
        let filename = output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("out_{token}.mp4"));
        Ok(ProcessOutcome::Stored {
            filename,
            size_mb,
            pitch_preserved: invocation.pitch_preserved,
            command_line: invocation.command_line(),
        })
    }
}

/// Download name handed to clients for inline responses.
fn download_name() -> String {
    format!(
        "repost_safe_{}.mp4",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}
