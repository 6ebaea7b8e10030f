// src/janitor.rs
//! Idle cleanup run at the end of every cycle. Best-effort: errors are skipped.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// A cleanup task that runs between cycles. Has no effect on correctness.
pub trait IdleCleanup: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns how many items were removed.
    fn sweep(&self) -> usize;
}

/// Removes files older than `max_age` from a scratch directory.
pub struct TempDirJanitor {
    dir: PathBuf,
    max_age: Duration,
}

impl TempDirJanitor {
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_max_age(dir, Self::DEFAULT_MAX_AGE)
    }

    pub fn with_max_age(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl IdleCleanup for TempDirJanitor {
    fn name(&self) -> &'static str {
        "temp-dir"
    }

    fn sweep(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return 0;
        };
        let now = SystemTime::now();
        let mut removed = 0;
        for e in entries.flatten() {
            let path = e.path();
            let Ok(meta) = e.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if age > self.max_age && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(target: "janitor", dir = %self.dir.display(), removed, "old temp files removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn only_stale_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.png");
        let stale = dir.path().join("stale.png");
        File::create(&fresh).unwrap();
        File::create(&stale)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(48 * 3600))
            .unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let janitor = TempDirJanitor::new(dir.path());
        assert_eq!(janitor.sweep(), 1);
        assert!(fresh.exists());
        assert!(!stale.exists());
        assert!(dir.path().join("nested").exists());
    }

    #[test]
    fn missing_dir_is_fine() {
        let janitor = TempDirJanitor::new("/definitely/not/here");
        assert_eq!(janitor.sweep(), 0);
    }
}
