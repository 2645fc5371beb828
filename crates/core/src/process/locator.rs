//! One-time resolution of the encoder binaries.

use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::executor::CommandRunner;
use super::platform::FIND_EXECUTABLE;
use crate::config::ConverterConfig;

/// Location of an external binary, resolved once and read-only afterwards.
///
/// A failed resolution is kept as an unresolved path: the bare binary name is
/// used when spawning, so a missing binary surfaces as a spawn failure on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderPath {
    name: String,
    location: Option<PathBuf>,
}

impl EncoderPath {
    /// A binary found at `location`.
    pub fn resolved(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
        }
    }

    /// A binary whose location could not be determined.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.location.is_some()
    }

    /// The program to put at the head of a command vector.
    pub fn program(&self) -> String {
        match &self.location {
            Some(path) => path.to_string_lossy().to_string(),
            None => self.name.clone(),
        }
    }
}

/// Finds binaries through an explicit override or the platform's PATH lookup.
pub struct EncoderLocator<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> EncoderLocator<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Resolves `name`, preferring `override_path` over a PATH search.
    ///
    /// Never fails: an unresolvable binary is logged and returned unresolved.
    pub async fn locate(&self, name: &str, override_path: Option<&Path>) -> EncoderPath {
        if let Some(path) = override_path {
            info!(binary = name, path = %path.display(), "Using configured binary location");
            return EncoderPath::resolved(name, path);
        }

        let command = [FIND_EXECUTABLE.to_string(), name.to_string()];
        match self.runner.execute(&command).await {
            Ok(lines) => match first_location(&lines) {
                Some(location) => {
                    info!(binary = name, path = %location.display(), "Binary is installed");
                    EncoderPath::resolved(name, location)
                }
                None => {
                    error!(binary = name, "Unable to detect the installation path: empty lookup result");
                    EncoderPath::unresolved(name)
                }
            },
            Err(e) => {
                error!(binary = name, error = %e, output = %e.output_text(), "Unable to detect the installation path");
                EncoderPath::unresolved(name)
            }
        }
    }
}

fn first_location(lines: &[String]) -> Option<PathBuf> {
    lines
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// The ffmpeg and ffprobe binaries used by every conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub ffmpeg: EncoderPath,
    pub ffprobe: EncoderPath,
}

impl Toolchain {
    /// Resolves both binaries once, honouring the configured overrides.
    pub async fn locate<R: CommandRunner + ?Sized>(runner: &R, config: &ConverterConfig) -> Self {
        let locator = EncoderLocator::new(runner);
        let ffmpeg = locator
            .locate("ffmpeg", config.ffmpeg_override().map(PathBuf::as_path))
            .await;
        let ffprobe = locator
            .locate("ffprobe", config.ffprobe_override().map(PathBuf::as_path))
            .await;

        Self { ffmpeg, ffprobe }
    }

    /// A toolchain with known binary locations.
    pub fn from_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: EncoderPath::resolved("ffmpeg", ffmpeg),
            ffprobe: EncoderPath::resolved("ffprobe", ffprobe),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.ffmpeg.is_resolved() && self.ffprobe.is_resolved()
    }
}
