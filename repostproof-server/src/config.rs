//! Server configuration from command-line flags and environment variables.
//!
//! There is no configuration file: every knob is a flag with an
//! environment-variable fallback, which keeps container deployments down
//! to plain environment settings.

use clap::Parser;
use repostproof_core::CoreConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Repostproof: randomized video re-encoding service"
)]
pub struct ServerArgs {
    /// Address to bind the HTTP listener to
    #[arg(long, env = "REPOSTPROOF_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP listener
    #[arg(long, env = "REPOSTPROOF_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory for transient upload and output files
    #[arg(
        long,
        env = "REPOSTPROOF_SCRATCH_DIR",
        default_value = "/tmp/repostproof",
        value_name = "DIR"
    )]
    pub scratch_dir: PathBuf,

    /// Minutes a stored output survives before the age sweep removes it
    #[arg(
        long,
        env = "REPOSTPROOF_RETENTION_MINS",
        default_value_t = 60,
        value_name = "MINUTES"
    )]
    pub retention_mins: u64,

    /// Public base URL used when responses carry a download link
    /// (defaults to http://<host>:<port>)
    #[arg(long, env = "REPOSTPROOF_PUBLIC_URL", value_name = "URL")]
    pub public_url: Option<String>,
}

impl ServerArgs {
    /// Base URL prepended to download paths in JSON responses.
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }

    /// Builds the core configuration from the parsed arguments.
    pub fn core_config(&self) -> CoreConfig {
        let mut config = CoreConfig::new(self.scratch_dir.clone());
        config.retention = Duration::from_secs(self.retention_mins * 60);
        config
    }
}
