//! Upload and download endpoints.
//!
//! `POST /repost-proof` takes one multipart `file` field, runs it through
//! the engine, and answers with either the processed bytes (small outputs)
//! or a JSON body carrying a download link (large outputs).
//! `GET /file-download/{filename}` streams a stored output if it is still
//! in scratch storage.

use crate::error::ApiError;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{debug, info, warn};
use repostproof_core::{
    process_upload, sweep_older_than, CoreConfig, FfmpegRunner, ProcessOutcome,
};
use serde::Serialize;

use std::sync::Arc;

/// Upload cap; the axum default of 2 MiB is far too small for video.
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024 * 1024;

/// Shared handler state: configuration plus the injected engine runner.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<CoreConfig>,
    pub public_url: Arc<String>,
    pub runner: Arc<dyn FfmpegRunner + Send + Sync>,
}

impl AppState {
    pub fn new(
        config: CoreConfig,
        public_url: String,
        runner: Arc<dyn FfmpegRunner + Send + Sync>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            public_url: Arc::new(public_url),
            runner,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/repost-proof", post(repost_proof))
        .route("/file-download/{filename}", get(download_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// JSON body returned when the output is left in scratch storage.
#[derive(Debug, Serialize)]
pub struct TranscodeResponse {
    pub success: bool,
    #[serde(rename = "file_size_MB")]
    pub file_size_mb: f64,
    pub pitch_preserved: bool,
    pub ffmpeg_cmd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

async fn repost_proof(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request_with("Invalid multipart body", e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request_with("Failed to read upload", e.to_string()))?;
            upload = Some(bytes.to_vec());
            break;
        }
    }
    let Some(data) = upload else {
        return Err(ApiError::bad_request("No file uploaded"));
    };

    info!("Processing upload ({} bytes)", data.len());

    let config = state.config.clone();
    let runner = state.runner.clone();
    let result = tokio::task::spawn_blocking(move || {
        let outcome = process_upload(runner.as_ref(), &config, &data);
        // The retention sweep runs after every request, success or failure.
        // It only touches files older than the retention window, so it can
        // never reap another in-flight request's pending output.
        match sweep_older_than(&config.scratch_dir, config.retention) {
            Ok(0) => {}
            Ok(n) => info!("Swept {} expired scratch file(s)", n),
            Err(e) => warn!("Scratch sweep failed: {}", e),
        }
        outcome
    })
    .await
    .map_err(|e| ApiError::internal("Processing failed", e.to_string()))?;

    match result? {
        ProcessOutcome::Inline {
            data,
            download_name,
            size_bytes,
            pitch_preserved,
            command_line,
        } => {
            info!(
                "Returning {} inline ({} bytes, pitch preserved: {})",
                download_name, size_bytes, pitch_preserved
            );
            debug!("Engine command: {}", command_line);
            Ok(attachment_response(&download_name, data))
        }
        ProcessOutcome::Stored {
            filename,
            size_mb,
            pitch_preserved,
            command_line,
        } => {
            info!("Output stored for download: {} ({} MiB)", filename, size_mb);
            let url = format!("{}/file-download/{}", state.public_url, filename);
            Ok(Json(TranscodeResponse {
                success: true,
                file_size_mb: size_mb,
                pitch_preserved,
                ffmpeg_cmd: command_line,
                url: Some(url),
            })
            .into_response())
        }
    }
}

async fn download_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    // Scratch filenames never contain separators; anything else is not ours.
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return not_found();
    }
    let path = state.config.scratch_dir.join(&filename);
    match tokio::fs::read(&path).await {
        Ok(data) => attachment_response(&filename, data),
        Err(_) => not_found(),
    }
}

fn attachment_response(filename: &str, data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        data,
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}
