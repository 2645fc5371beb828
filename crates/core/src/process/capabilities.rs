//! Encoder capability detection.

use serde::{Deserialize, Serialize};

use super::executor::CommandRunner;
use super::locator::EncoderPath;

/// Encoders needed for sticker output, as reported by the installed ffmpeg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderCapabilities {
    /// VP9 encoder for video stickers
    pub libvpx_vp9: bool,
    /// WebP encoder for static stickers
    pub libwebp: bool,
}

impl EncoderCapabilities {
    /// Detect available encoders by probing ffmpeg.
    pub async fn detect<R: CommandRunner + ?Sized>(runner: &R, ffmpeg: &EncoderPath) -> Self {
        let command = [
            ffmpeg.program(),
            "-hide_banner".to_string(),
            "-encoders".to_string(),
        ];

        match runner.execute(&command).await {
            Ok(lines) => Self::from_encoder_list(&lines),
            Err(_) => Self::default(),
        }
    }

    /// Parses the encoder table printed by `ffmpeg -encoders`.
    pub fn from_encoder_list(lines: &[String]) -> Self {
        let has = |encoder: &str| {
            lines
                .iter()
                .any(|line| line.split_whitespace().nth(1) == Some(encoder))
        };

        Self {
            libvpx_vp9: has("libvpx-vp9"),
            libwebp: has("libwebp"),
        }
    }

    /// Whether both sticker encoders are available.
    pub fn supports_stickers(&self) -> bool {
        self.libvpx_vp9 && self.libwebp
    }
}
