//! Sticker media handling.
//!
//! A file is classified by content, checked against the sticker
//! requirements for its category and, when needed, converted:
//!
//! - videos and GIFs become VP9 WebM through a two-pass ffmpeg encode
//! - images become lossless WebP with the longer side at 512 px
//! - gzip animations are validated only
//!
//! [`MediaConverter`] is the entry point.

mod animation;
mod compliance;
pub mod constraints;
mod converter;
mod error;
mod image;
pub mod mime;
mod probe;
mod temp;
mod types;
mod video;

pub use animation::{parse_metadata, AnimationMetadata, MAX_DECOMPRESSED_SIZE};
pub use compliance::{animation_compliant, has_sticker_dimensions, image_compliant, video_compliant};
pub use converter::MediaConverter;
pub use error::MediaError;
pub use image::ImageConverter;
pub use probe::{parse_probe_output, FrameRate, MediaProbe, MediaProber, VideoStream};
pub use types::{Conversion, ConversionResult, DetectedMedia, MediaCategory};
pub use video::VideoConverter;
