//! Telegram sticker constraints.
//!
//! See <https://core.telegram.org/stickers> for the static, video and
//! animated sticker requirements these values come from.

/// Side length that one side of every sticker must match exactly.
pub const MAX_SIDE_LENGTH: u32 = 512;

pub const MAX_IMAGE_FILE_SIZE: u64 = 512_000;
pub const MAX_VIDEO_FILE_SIZE: u64 = 256_000;
pub const MAX_ANIMATION_FILE_SIZE: u64 = 64_000;

pub const MAX_VIDEO_FRAME_RATE: u32 = 30;
pub const MAX_VIDEO_DURATION_MILLIS: u64 = 3_000;
pub const MAX_ANIMATION_FRAME_RATE: u32 = 60;
pub const MAX_ANIMATION_DURATION_SECONDS: u32 = 3;

pub const VP9_CODEC: &str = "vp9";
pub const MATROSKA_FORMAT: &str = "matroska";

/// Target bitrate of the VP9 encode, in kbit/s.
pub const VIDEO_BITRATE_KBPS: u32 = 650;

/// Image MIME types that may be sent as stickers without conversion.
pub const COMPLIANT_IMAGE_MIME_TYPES: &[&str] = &["image/png", "image/webp"];
