//! Sticker requirement checks.
//!
//! Every check is pure so the same answer comes back for the same inputs.

use super::animation::AnimationMetadata;
use super::constraints::{
    COMPLIANT_IMAGE_MIME_TYPES, MATROSKA_FORMAT, MAX_ANIMATION_DURATION_SECONDS,
    MAX_ANIMATION_FILE_SIZE, MAX_ANIMATION_FRAME_RATE, MAX_IMAGE_FILE_SIZE, MAX_SIDE_LENGTH,
    MAX_VIDEO_DURATION_MILLIS, MAX_VIDEO_FILE_SIZE, MAX_VIDEO_FRAME_RATE, VP9_CODEC,
};
use super::probe::MediaProbe;

/// One side is exactly the maximum and the other does not exceed it.
pub fn has_sticker_dimensions(width: u32, height: u32) -> bool {
    (width == MAX_SIDE_LENGTH && height <= MAX_SIDE_LENGTH)
        || (height == MAX_SIDE_LENGTH && width <= MAX_SIDE_LENGTH)
}

pub fn image_compliant(probe: &MediaProbe, mime_type: &str, file_size: u64) -> bool {
    COMPLIANT_IMAGE_MIME_TYPES.contains(&mime_type)
        && has_sticker_dimensions(probe.width(), probe.height())
        && file_size <= MAX_IMAGE_FILE_SIZE
}

pub fn video_compliant(probe: &MediaProbe, file_size: u64) -> bool {
    let frame_rate_ok = probe
        .frame_rate()
        .is_some_and(|fps| fps <= f64::from(MAX_VIDEO_FRAME_RATE));
    let duration_ok = probe
        .duration_ms
        .is_some_and(|ms| ms > 0 && ms <= MAX_VIDEO_DURATION_MILLIS);

    has_sticker_dimensions(probe.width(), probe.height())
        && frame_rate_ok
        && probe.video.codec.starts_with(VP9_CODEC)
        && duration_ok
        && !probe.has_audio
        && probe.format_name == MATROSKA_FORMAT
        && file_size <= MAX_VIDEO_FILE_SIZE
}

pub fn animation_compliant(meta: &AnimationMetadata, file_size: u64) -> bool {
    meta.fr > 0.0
        && meta.fr <= f64::from(MAX_ANIMATION_FRAME_RATE)
        && meta
            .duration_secs()
            .is_some_and(|secs| secs <= f64::from(MAX_ANIMATION_DURATION_SECONDS))
        && meta.w == MAX_SIDE_LENGTH
        && meta.h == MAX_SIDE_LENGTH
        && file_size <= MAX_ANIMATION_FILE_SIZE
}
