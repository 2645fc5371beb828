//! Animated sticker validation.
//!
//! Animated stickers are gzip compressed Lottie documents. They are only
//! validated, never converted.

use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::compliance::animation_compliant;
use super::error::MediaError;
use super::types::{Conversion, ConversionResult};

/// Upper bound on the decompressed document, against gzip bombs.
pub const MAX_DECOMPRESSED_SIZE: u64 = 10 * 1024 * 1024;

/// The Lottie header fields that matter for compliance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnimationMetadata {
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
    /// Frame rate
    pub fr: f64,
    /// In point, the first frame
    pub ip: f64,
    /// Out point, the last frame
    pub op: f64,
}

impl AnimationMetadata {
    /// Playback length in seconds, `None` without a positive frame rate.
    pub fn duration_secs(&self) -> Option<f64> {
        (self.fr > 0.0).then(|| (self.op - self.ip) / self.fr)
    }
}

/// Decompresses and parses a gzip payload.
///
/// Returns `None` when the payload is not a gzip stream holding the
/// expected JSON document, so the caller can treat it as unsupported.
pub fn parse_metadata(compressed: &[u8]) -> Option<AnimationMetadata> {
    let mut json = Vec::new();
    let mut decoder = GzDecoder::new(compressed).take(MAX_DECOMPRESSED_SIZE + 1);
    if let Err(e) = decoder.read_to_end(&mut json) {
        debug!(error = %e, "Unable to decompress gzip payload");
        return None;
    }

    if json.len() as u64 > MAX_DECOMPRESSED_SIZE {
        debug!(limit = MAX_DECOMPRESSED_SIZE, "Decompressed payload too large");
        return None;
    }

    match serde_json::from_slice(&json) {
        Ok(meta) => Some(meta),
        Err(e) => {
            debug!(error = %e, "Gzip payload is not an animated sticker");
            None
        }
    }
}

/// Validates a gzip file as an animated sticker.
///
/// A compliant animation needs no conversion; a non-compliant one is rejected
/// since there is no way to fix it. Anything that does not parse is unsupported.
pub async fn validate(path: &Path, mime_type: &str) -> ConversionResult {
    let compressed = tokio::fs::read(path)
        .await
        .map_err(|e| MediaError::file_operation("read", path, e))?;
    let file_size = compressed.len() as u64;

    let Some(meta) = parse_metadata(&compressed) else {
        return Err(MediaError::unsupported(mime_type));
    };

    if animation_compliant(&meta, file_size) {
        return Ok(Conversion::NoConversionNeeded);
    }

    Err(MediaError::non_compliant_animation(describe(&meta, file_size)))
}

fn describe(meta: &AnimationMetadata, file_size: u64) -> String {
    let duration = meta
        .duration_secs()
        .map(|secs| format!("{:.2} s", secs))
        .unwrap_or_else(|| "unknown duration".to_string());
    format!(
        "{}x{} at {} fps, {}, {} bytes",
        meta.w, meta.h, meta.fr, duration, file_size
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_duration() {
        let meta = AnimationMetadata {
            w: 512,
            h: 512,
            fr: 60.0,
            ip: 0.0,
            op: 180.0,
        };
        assert_eq!(meta.duration_secs(), Some(3.0));

        let still = AnimationMetadata { fr: 0.0, ..meta };
        assert_eq!(still.duration_secs(), None);
    }

    #[test]
    fn test_parse_metadata() {
        let payload = fixtures::animation_payload(512, 512, 60.0, 0.0, 120.0);
        let meta = parse_metadata(&payload).unwrap();
        assert_eq!((meta.w, meta.h), (512, 512));
        assert_eq!(meta.fr, 60.0);
        assert_eq!(meta.op, 120.0);
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let payload = fixtures::gzip(b"this is not json");
        assert_eq!(parse_metadata(&payload), None);
    }

    #[test]
    fn test_parse_rejects_non_gzip() {
        assert_eq!(parse_metadata(b"{\"w\":512}"), None);
    }

    #[test]
    fn test_parse_rejects_oversized_payload() {
        let mut json = br#"{"w":512,"h":512,"fr":60,"ip":0,"op":60,"pad":""#.to_vec();
        json.resize(json.len() + MAX_DECOMPRESSED_SIZE as usize, b'a');
        json.extend_from_slice(b"\"}");
        assert_eq!(parse_metadata(&fixtures::gzip(&json)), None);
    }

    #[tokio::test]
    async fn test_validate_outcomes() {
        let dir = tempfile::tempdir().unwrap();

        let compliant = dir.path().join("compliant.tgs");
        std::fs::write(&compliant, fixtures::animation_payload(512, 512, 60.0, 0.0, 180.0)).unwrap();
        assert_eq!(
            validate(&compliant, "application/gzip").await.unwrap(),
            Conversion::NoConversionNeeded
        );

        let too_long = dir.path().join("long.tgs");
        std::fs::write(&too_long, fixtures::animation_payload(512, 512, 60.0, 0.0, 240.0)).unwrap();
        let err = validate(&too_long, "application/gzip").await.unwrap_err();
        assert!(matches!(err, MediaError::NonCompliantAnimation { .. }));
        assert!(err.to_string().contains("4.00 s"));

        let archive = dir.path().join("archive.gz");
        std::fs::write(&archive, fixtures::gzip(b"plain text")).unwrap();
        let err = validate(&archive, "application/gzip").await.unwrap_err();
        assert!(matches!(
            err,
            MediaError::UnsupportedMedia { ref mime_type } if mime_type == "application/gzip"
        ));
    }
}
