//! Scoped temporary files for conversion outputs.
//!
//! Outputs live as [`TempPath`]s and are deleted if dropped, so an abandoned
//! or failed conversion never leaves a file behind. Only a successful
//! conversion calls [`TempPath::keep`] and hands the path to the caller.

use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir, TempPath};
use tracing::warn;

use super::error::MediaError;
use super::types::{Conversion, ConversionResult};

const TEMP_PREFIX: &str = "Stickerify-";
const PASS_LOG_PREFIX: &str = "Stickerify-passlog-";

/// Creates an empty uniquely named output file such as `Stickerify-a1B2c3.webm`.
pub fn output_file(temp_dir: &Path, extension: &str) -> Result<TempPath, MediaError> {
    let file = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!(".{}", extension))
        .tempfile_in(temp_dir)
        .map_err(|e| MediaError::file_operation("create a temporary file in", temp_dir, e))?;

    Ok(file.into_temp_path())
}

/// Deletes an output that will not be returned, logging failures.
pub fn discard(path: TempPath) {
    let location = path.to_path_buf();
    if let Err(e) = path.close() {
        warn!(path = %location.display(), error = %e, "Unable to delete temporary file");
    }
}

/// Checks the size of a finished output and hands it over to the caller.
///
/// An output above `limit` is deleted and reported as an optimization failure.
pub async fn finish(output: TempPath, limit: u64) -> ConversionResult {
    let size = match tokio::fs::metadata(&output).await {
        Ok(metadata) => metadata.len(),
        Err(e) => return Err(MediaError::file_operation("inspect", &output, e)),
    };

    if size > limit {
        discard(output);
        return Err(MediaError::OptimizationLimit { size, limit });
    }

    let path = output
        .keep()
        .map_err(|e| MediaError::file_operation("keep", &e.path, e.error))?;
    Ok(Conversion::Converted(path))
}

/// Scratch directory for the statistics of a two-pass encode.
///
/// The encoder writes `<prefix>-0.log` (and sometimes more) next to the
/// prefix; the whole directory goes away when this is dropped.
#[derive(Debug)]
pub struct PassLog {
    dir: Option<TempDir>,
    prefix: PathBuf,
}

impl PassLog {
    pub fn create(temp_dir: &Path) -> Result<Self, MediaError> {
        let dir = Builder::new()
            .prefix(PASS_LOG_PREFIX)
            .tempdir_in(temp_dir)
            .map_err(|e| MediaError::file_operation("create a pass log directory in", temp_dir, e))?;
        let prefix = dir.path().join("pass");

        Ok(Self {
            dir: Some(dir),
            prefix,
        })
    }

    /// Value for ffmpeg's `-passlogfile`.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }
}

impl Drop for PassLog {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let location = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %location.display(), error = %e, "Unable to delete pass log files");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[test]
    fn test_output_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_file(dir.path(), "webm").unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Stickerify-"));
        assert!(name.ends_with(".webm"));
        assert!(path.exists());
    }

    #[test]
    fn test_dropped_output_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_file(dir.path(), "webp").unwrap();
        let location = path.to_path_buf();

        drop(path);
        assert!(!location.exists());
    }

    #[test]
    fn test_kept_output_survives() {
        let dir = tempfile::tempdir().unwrap();
        let location = output_file(dir.path(), "webp").unwrap().keep().unwrap();
        assert!(location.exists());
    }

    #[test]
    fn test_output_file_in_missing_dir() {
        let err = output_file(Path::new("/nonexistent/stickerify"), "webp").unwrap_err();
        assert!(matches!(err, MediaError::FileOperation { .. }));
    }

    #[test]
    fn test_discard_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_file(dir.path(), "webp").unwrap();
        let location = path.to_path_buf();

        discard(path);
        assert!(!location.exists());
    }

    #[test]
    fn test_discard_tolerates_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_file(dir.path(), "webm").unwrap();
        std::fs::remove_file(&path).unwrap();

        // Logged, not propagated
        discard(path);
        assert!(entries(dir.path()).is_empty());
    }

    #[test]
    fn test_pass_log_tolerates_removed_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pass_log = PassLog::create(dir.path()).unwrap();
        std::fs::remove_dir_all(pass_log.prefix().parent().unwrap()).unwrap();

        drop(pass_log);
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_finish_enforces_limit() {
        let dir = tempfile::tempdir().unwrap();

        let small = output_file(dir.path(), "webm").unwrap();
        std::fs::write(&small, [0u8; 10]).unwrap();
        let kept = finish(small, 10).await.unwrap();
        assert!(kept.path().unwrap().exists());

        let large = output_file(dir.path(), "webm").unwrap();
        let location = large.to_path_buf();
        std::fs::write(&large, [0u8; 11]).unwrap();
        let err = finish(large, 10).await.unwrap_err();
        assert!(matches!(err, MediaError::OptimizationLimit { size: 11, limit: 10 }));
        assert!(!location.exists());
    }

    #[test]
    fn test_pass_log_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let pass_log = PassLog::create(dir.path()).unwrap();

        let log = PathBuf::from(format!("{}-0.log", pass_log.prefix().display()));
        std::fs::write(&log, "stats").unwrap();
        std::fs::write(format!("{}-0.log.mbtree", pass_log.prefix().display()), "tree").unwrap();
        assert_eq!(entries(dir.path()).len(), 1);

        drop(pass_log);
        assert!(entries(dir.path()).is_empty());
    }
}
