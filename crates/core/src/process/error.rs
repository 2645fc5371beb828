//! Error types for the process module.

use thiserror::Error;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The command vector had no program.
    #[error("Cannot execute an empty command")]
    EmptyCommand,

    /// The admission semaphore was closed.
    #[error("Process admission is closed")]
    AdmissionClosed,

    /// The program could not be started.
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the program failed.
    #[error("Failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited unsuccessfully.
    #[error("The command {program} exited with code {code:?}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        output: Vec<String>,
    },

    /// The program did not finish in time and was killed.
    #[error("The command {program} timed out after {timeout_secs} seconds")]
    Timeout {
        program: String,
        timeout_secs: u64,
        output: Vec<String>,
    },
}

impl ProcessError {
    /// Output captured before the failure, or an empty slice.
    pub fn output(&self) -> &[String] {
        match self {
            Self::NonZeroExit { output, .. } | Self::Timeout { output, .. } => output,
            _ => &[],
        }
    }

    /// Captured output joined into a single string.
    pub fn output_text(&self) -> String {
        self.output().join("\n")
    }

    /// Whether the program ran and reported a failure, as opposed to never running properly.
    pub fn is_exit_failure(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. })
    }
}
