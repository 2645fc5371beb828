//! Stream inspection through ffprobe.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::debug;

use super::error::{path_argument, MediaError};
use crate::process::{CommandRunner, EncoderPath};

/// Frame rate as the rational ffprobe reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Parses `"30000/1001"` or a plain number such as `"25"`.
    /// Returns `None` for the `0/0` placeholder and anything unparseable.
    pub fn parse(value: &str) -> Option<Self> {
        let (num, den) = match value.split_once('/') {
            Some((num, den)) => (num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => (value.trim().parse().ok()?, 1),
        };

        if num == 0 || den == 0 {
            return None;
        }
        Some(Self { num, den })
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// The first video stream of a probed file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoStream {
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: Option<FrameRate>,
}

/// What the converters need to know about an input file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    /// First entry of ffprobe's comma separated `format_name`
    pub format_name: String,
    pub duration_ms: Option<u64>,
    pub video: VideoStream,
    pub has_audio: bool,
}

impl MediaProbe {
    pub fn width(&self) -> u32 {
        self.video.width
    }

    pub fn height(&self) -> u32 {
        self.video.height
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.video.frame_rate.as_ref().map(FrameRate::as_f64)
    }
}

/// Runs ffprobe through a [`CommandRunner`].
pub struct MediaProber<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    ffprobe: &'a EncoderPath,
}

impl<'a, R: CommandRunner + ?Sized> MediaProber<'a, R> {
    pub fn new(runner: &'a R, ffprobe: &'a EncoderPath) -> Self {
        Self { runner, ffprobe }
    }

    /// Probes `path`.
    ///
    /// A probe that runs but fails, or reports no usable video stream, means
    /// the file is corrupted. Failing to run the probe at all is a process error.
    pub async fn probe(&self, path: &Path) -> Result<MediaProbe, MediaError> {
        let command = probe_command(self.ffprobe, path_argument(path)?);
        debug!(command = ?command, "Probing media");

        let lines = self.runner.execute(&command).await.map_err(|e| {
            if e.is_exit_failure() {
                MediaError::corrupted(format!("ffprobe rejected {}: {}", path.display(), e))
            } else {
                MediaError::ProcessExecution(e)
            }
        })?;

        parse_probe_output(&lines)
    }
}

fn probe_command(ffprobe: &EncoderPath, path: &str) -> Vec<String> {
    vec![
        ffprobe.program(),
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.to_string(),
    ]
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Parses ffprobe's JSON output, given as captured lines.
pub fn parse_probe_output(lines: &[String]) -> Result<MediaProbe, MediaError> {
    let output = lines.join("\n");

    // Merged stderr may surround the JSON document
    let json = match (output.find('{'), output.rfind('}')) {
        (Some(start), Some(end)) if start < end => &output[start..=end],
        _ => return Err(MediaError::corrupted("ffprobe produced no stream information")),
    };

    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| MediaError::corrupted(format!("Failed to parse ffprobe output: {}", e)))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::corrupted("No video stream found"))?;

    let (width, height) = match (video.width, video.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => (width, height),
        _ => return Err(MediaError::corrupted("The video stream has no dimensions")),
    };

    let frame_rate = video
        .avg_frame_rate
        .as_deref()
        .and_then(FrameRate::parse)
        .or_else(|| video.r_frame_rate.as_deref().and_then(FrameRate::parse));

    let format_name = probe
        .format
        .as_ref()
        .and_then(|f| f.format_name.as_deref())
        .and_then(|name| name.split(',').next())
        .unwrap_or_default()
        .to_string();

    let duration_ms = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(parse_duration_ms);

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(MediaProbe {
        format_name,
        duration_ms,
        video: VideoStream {
            codec: video.codec_name.clone().unwrap_or_default(),
            width,
            height,
            frame_rate,
        },
        has_audio,
    })
}

fn parse_duration_ms(value: &str) -> Option<u64> {
    let secs = value.trim().parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}
