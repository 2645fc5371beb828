//! Video sticker conversion through a two-pass VP9 encode.

use std::path::Path;
use tracing::debug;

use super::constraints::{
    MAX_SIDE_LENGTH, MAX_VIDEO_DURATION_MILLIS, MAX_VIDEO_FILE_SIZE, MAX_VIDEO_FRAME_RATE,
    VIDEO_BITRATE_KBPS,
};
use super::error::{path_argument, MediaError};
use super::probe::MediaProbe;
use super::temp::{self, PassLog};
use super::types::ConversionResult;
use crate::process::{CommandRunner, EncoderPath, NULL_DEVICE};

/// Which of the two encoder passes a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Analysis only, output discarded
    First,
    /// Final encode using the first pass statistics
    Second,
}

impl Pass {
    fn number(self) -> &'static str {
        match self {
            Self::First => "1",
            Self::Second => "2",
        }
    }
}

/// Converts videos and GIFs to VP9 WebM stickers.
pub struct VideoConverter<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    ffmpeg: &'a EncoderPath,
    temp_dir: &'a Path,
}

impl<'a, R: CommandRunner + ?Sized> VideoConverter<'a, R> {
    pub fn new(runner: &'a R, ffmpeg: &'a EncoderPath, temp_dir: &'a Path) -> Self {
        Self {
            runner,
            ffmpeg,
            temp_dir,
        }
    }

    /// Encodes `input` in two passes, the second only after the first succeeded.
    ///
    /// On any failure both the output and the pass statistics are removed.
    pub async fn convert(&self, input: &Path, probe: &MediaProbe) -> ConversionResult {
        let input = path_argument(input)?;
        let output = temp::output_file(self.temp_dir, "webm")?;
        if let Err(e) = self.encode(input, &output, probe).await {
            temp::discard(output);
            return Err(e);
        }
        temp::finish(output, MAX_VIDEO_FILE_SIZE).await
    }

    async fn encode(
        &self,
        input: &str,
        output: &Path,
        probe: &MediaProbe,
    ) -> Result<(), MediaError> {
        let output = path_argument(output)?;
        let pass_log = PassLog::create(self.temp_dir)?;
        let plan = EncodePlan {
            ffmpeg: self.ffmpeg,
            input,
            pass_log: path_argument(pass_log.prefix())?,
            frame_rate: target_frame_rate(probe),
        };

        let first = plan.command(Pass::First, NULL_DEVICE);
        debug!(command = ?first, "Running first encoding pass");
        self.runner.execute(&first).await?;

        let second = plan.command(Pass::Second, output);
        debug!(command = ?second, "Running second encoding pass");
        self.runner.execute(&second).await?;
        Ok(())
    }
}

/// The source frame rate when it is already within the limit, the limit otherwise.
fn target_frame_rate(probe: &MediaProbe) -> String {
    match probe.video.frame_rate {
        Some(rate) if rate.as_f64() <= f64::from(MAX_VIDEO_FRAME_RATE) => rate.to_string(),
        _ => MAX_VIDEO_FRAME_RATE.to_string(),
    }
}

struct EncodePlan<'a> {
    ffmpeg: &'a EncoderPath,
    input: &'a str,
    pass_log: &'a str,
    frame_rate: String,
}

impl EncodePlan<'_> {
    fn filter(&self) -> String {
        format!(
            "scale='if(gt(iw,ih),{side},-2)':'if(gt(iw,ih),-2,{side})',fps={fps}",
            side = MAX_SIDE_LENGTH,
            fps = self.frame_rate
        )
    }

    fn command(&self, pass: Pass, output: &str) -> Vec<String> {
        let program = self.ffmpeg.program();
        let filter = self.filter();
        let bitrate = format!("{}K", VIDEO_BITRATE_KBPS);
        let duration = format!("{}", MAX_VIDEO_DURATION_MILLIS as f64 / 1000.0);

        [
            program.as_str(),
            "-v",
            "error",
            "-y",
            "-i",
            self.input,
            "-vf",
            filter.as_str(),
            "-c:v",
            "libvpx-vp9",
            "-b:v",
            bitrate.as_str(),
            "-pix_fmt",
            "yuv420p",
            "-t",
            duration.as_str(),
            "-an",
            "-pass",
            pass.number(),
            "-passlogfile",
            self.pass_log,
            "-f",
            "webm",
            output,
        ]
        .iter()
        .map(|arg| arg.to_string())
        .collect()
    }
}
