use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the media converter and its external processes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConverterConfig {
    /// Explicit location of the ffmpeg binary; searched on PATH when unset.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit location of the ffprobe binary; searched on PATH when unset.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Maximum number of external processes running at the same time.
    #[serde(default = "default_concurrent_processes")]
    pub concurrent_processes: usize,

    /// Timeout for a single external process in seconds.
    #[serde(default = "default_process_timeout")]
    pub process_timeout_secs: u64,

    /// Directory where converted files and pass logs are created.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

fn default_concurrent_processes() -> usize {
    4
}

fn default_process_timeout() -> u64 {
    60
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            concurrent_processes: default_concurrent_processes(),
            process_timeout_secs: default_process_timeout(),
            temp_dir: default_temp_dir(),
        }
    }
}

impl ConverterConfig {
    /// Sets explicit ffmpeg/ffprobe locations.
    pub fn with_paths(mut self, ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        self.ffmpeg_path = Some(ffmpeg_path);
        self.ffprobe_path = Some(ffprobe_path);
        self
    }

    /// Sets the maximum number of concurrent processes.
    pub fn with_concurrent_processes(mut self, max: usize) -> Self {
        self.concurrent_processes = max;
        self
    }

    /// Sets the per-process timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.process_timeout_secs = timeout_secs;
        self
    }

    /// Sets the temp directory.
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    /// The ffmpeg override, ignoring blank values.
    pub fn ffmpeg_override(&self) -> Option<&PathBuf> {
        non_blank(self.ffmpeg_path.as_ref())
    }

    /// The ffprobe override, ignoring blank values.
    pub fn ffprobe_override(&self) -> Option<&PathBuf> {
        non_blank(self.ffprobe_path.as_ref())
    }
}

fn non_blank(path: Option<&PathBuf>) -> Option<&PathBuf> {
    path.filter(|p| !p.as_os_str().to_string_lossy().trim().is_empty())
}
