//! Types for the media module.

use std::path::PathBuf;

use super::error::MediaError;

/// Category a file falls into, decided from its content-sniffed MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaCategory {
    /// Static image, converted to WebP
    Image,
    /// Video or GIF, converted to VP9 WebM
    Video,
    /// Gzip payload that may be an animated sticker
    Animation,
    /// Anything else
    Unsupported,
}

/// Outcome of a MIME sniff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedMedia {
    pub mime_type: &'static str,
    pub category: MediaCategory,
}

/// Successful outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The input already meets the sticker requirements and can be used as is.
    NoConversionNeeded,
    /// A new file was created; the caller owns it and must delete it.
    Converted(PathBuf),
}

impl Conversion {
    /// Path of the converted file, if one was produced.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NoConversionNeeded => None,
            Self::Converted(path) => Some(path),
        }
    }
}

/// Result of [`MediaConverter::convert`](super::MediaConverter::convert).
pub type ConversionResult = Result<Conversion, MediaError>;
