//! Error types for the media module.

use std::io;
use std::path::Path;
use thiserror::Error;

use crate::process::ProcessError;

/// Every way a conversion can fail.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The detected type cannot be turned into a sticker.
    #[error("The file with {mime_type} MIME type is not supported")]
    UnsupportedMedia { mime_type: String },

    /// An animated sticker that does not meet the requirements.
    #[error("The animated sticker is not compliant: {reason}")]
    NonCompliantAnimation { reason: String },

    /// The media probe could not read the stream information.
    #[error("The media file could not be read: {reason}")]
    CorruptedMedia { reason: String },

    /// A local filesystem operation failed.
    #[error("{context}: {source}")]
    FileOperation {
        context: String,
        #[source]
        source: io::Error,
    },

    /// An external process failed or timed out.
    #[error("An external process failed: {0}")]
    ProcessExecution(#[from] ProcessError),

    /// The converted file is still above the size limit.
    #[error("The converted file is {size} bytes, above the {limit} bytes limit")]
    OptimizationLimit { size: u64, limit: u64 },
}

impl MediaError {
    /// Creates an unsupported media error for the detected MIME type.
    pub fn unsupported(mime_type: impl Into<String>) -> Self {
        Self::UnsupportedMedia {
            mime_type: mime_type.into(),
        }
    }

    pub fn non_compliant_animation(reason: impl Into<String>) -> Self {
        Self::NonCompliantAnimation {
            reason: reason.into(),
        }
    }

    pub fn corrupted(reason: impl Into<String>) -> Self {
        Self::CorruptedMedia {
            reason: reason.into(),
        }
    }

    /// Creates a file operation error mentioning the affected path.
    pub fn file_operation(action: &str, path: &Path, source: io::Error) -> Self {
        Self::FileOperation {
            context: format!("Unable to {} {}", action, path.display()),
            source,
        }
    }

    /// Stable name of the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedMedia { .. } => "unsupported_media",
            Self::NonCompliantAnimation { .. } => "non_compliant_animation",
            Self::CorruptedMedia { .. } => "corrupted_media",
            Self::FileOperation { .. } => "file_operation",
            Self::ProcessExecution(_) => "process_execution",
            Self::OptimizationLimit { .. } => "optimization_limit",
        }
    }
}

/// Borrows `path` as a command argument. Paths that are not UTF-8 cannot be
/// passed to the encoders unchanged, so they are rejected before any process runs.
pub(crate) fn path_argument(path: &Path) -> Result<&str, MediaError> {
    path.to_str().ok_or_else(|| {
        MediaError::file_operation(
            "use",
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path is not valid UTF-8"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_names_mime_type() {
        let err = MediaError::unsupported("text/plain");
        assert_eq!(
            err.to_string(),
            "The file with text/plain MIME type is not supported"
        );
        assert_eq!(err.kind(), "unsupported_media");
    }

    #[test]
    fn test_file_operation_context() {
        let err = MediaError::file_operation(
            "read",
            Path::new("/tmp/input"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(err.to_string().starts_with("Unable to read /tmp/input"));
        assert_eq!(err.kind(), "file_operation");
    }

    #[test]
    fn test_path_argument() {
        assert_eq!(path_argument(Path::new("/tmp/in.mp4")).unwrap(), "/tmp/in.mp4");
    }

    #[cfg(unix)]
    #[test]
    fn test_path_argument_rejects_non_utf8() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/clip-\xff.mp4"));
        let err = path_argument(path).unwrap_err();
        assert!(matches!(
            err,
            MediaError::FileOperation { ref source, .. } if source.kind() == io::ErrorKind::InvalidInput
        ));
    }

    #[test]
    fn test_process_error_conversion() {
        let err: MediaError = ProcessError::EmptyCommand.into();
        assert!(matches!(err, MediaError::ProcessExecution(_)));
    }
}
