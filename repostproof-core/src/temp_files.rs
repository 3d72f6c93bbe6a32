//! Scratch-file management utilities.
//!
//! Every request works against uniquely-named files under a shared scratch
//! directory. Input copies (and per-call LUT files) are wrapped in a
//! `ScratchGuard` so they are removed on every exit path; stored outputs are
//! reaped by an age-based sweep scoped strictly to files older than the
//! retention window.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreResult;

/// Length of the random token embedded in scratch filenames.
const TOKEN_LEN: usize = 12;

/// Returns a random alphanumeric token for scratch filenames.
pub fn scratch_token() -> String {
    use rand::distributions::Alphanumeric;
    use rand::{thread_rng, Rng};

    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Returns a scratch file path `<prefix>_<token>.<extension>` under `dir`.
/// Does not create the file.
pub fn create_scratch_file_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{prefix}_{}.{extension}", scratch_token()))
}

/// Owns a scratch file path and removes the file when dropped.
///
/// Removal failure is ignored: the file may legitimately be gone already,
/// and the age-based sweep will catch anything left behind.
#[derive(Debug)]
pub struct ScratchGuard(PathBuf);

impl ScratchGuard {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::debug!("Failed to remove scratch file {}: {}", self.0.display(), e);
            }
        }
    }
}

/// Removes regular files under `dir` whose modification age exceeds
/// `max_age`, returning how many were removed.
///
/// A missing directory counts as nothing to sweep. Subdirectories and
/// unreadable entries are skipped rather than treated as errors.
pub fn sweep_older_than(dir: &Path, max_age: Duration) -> CoreResult<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let expired = metadata
            .modified()
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .map(|age| age > max_age)
            .unwrap_or(false);
        if expired && fs::remove_file(&path).is_ok() {
            log::debug!("Swept expired scratch file: {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_scratch_paths_are_unique() {
        let dir = Path::new("/tmp");
        let a = create_scratch_file_path(dir, "in", "mp4");
        let b = create_scratch_file_path(dir, "in", "mp4");
        assert_ne!(a, b);
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("in_"));
        assert!(a.extension().unwrap() == "mp4");
    }

    #[test]
    fn test_guard_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in_abc.mp4");
        File::create(&path).unwrap().write_all(b"x").unwrap();
        {
            let _guard = ScratchGuard::new(path.clone());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_guard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never_created.mp4");
        let _guard = ScratchGuard::new(path);
        // Drop must not panic.
    }

    #[test]
    fn test_sweep_removes_only_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("out_old.mp4");
        File::create(&old).unwrap().write_all(b"x").unwrap();
        std::thread::sleep(Duration::from_millis(200));
        let fresh = dir.path().join("out_fresh.mp4");
        File::create(&fresh).unwrap().write_all(b"x").unwrap();

        // Long retention: nothing qualifies.
        assert_eq!(sweep_older_than(dir.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert!(old.exists() && fresh.exists());

        // Tight retention: only the aged file goes.
        let removed = sweep_older_than(dir.path(), Duration::from_millis(100)).unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_sweep_missing_dir_is_empty() {
        let removed =
            sweep_older_than(Path::new("/nonexistent/repostproof-sweep"), Duration::ZERO).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_sweep_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(sweep_older_than(dir.path(), Duration::ZERO).unwrap(), 0);
        assert!(dir.path().join("subdir").exists());
    }
}
