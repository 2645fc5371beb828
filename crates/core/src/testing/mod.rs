//! Testing utilities and mock implementations.
//!
//! [`MockRunner`] stands in for the process executor so the whole conversion
//! flow can be exercised without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stickerify_core::testing::{fixtures, MockResponse, MockRunner};
//!
//! let runner = MockRunner::new();
//! runner
//!     .push_response("ffprobe", MockResponse::lines(fixtures::image_probe_lines("png", 512, 512)))
//!     .await;
//!
//! let converter = MediaConverter::new(Arc::new(runner.clone()), toolchain, &config);
//! ```

mod mock_runner;

pub use mock_runner::{MockResponse, MockRunner};

/// Test fixtures and helper functions.
pub mod fixtures {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    /// Leading bytes of a PNG file.
    pub const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\x02\0\0\0\x02\0\x08\x06\0\0\0";

    /// Leading bytes of a JPEG file.
    pub const JPEG_HEADER: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0\x01\x01\0\0\x01\0\x01\0\0";

    /// Leading bytes of a WebM file.
    pub const WEBM_HEADER: &[u8] =
        b"\x1a\x45\xdf\xa3\x9f\x42\x86\x81\x01\x42\xf7\x81\x01\x42\xf2\x81\x04\x42\xf3\x81\x08\x42\x82\x84webm";

    /// Leading bytes of an MP4 file.
    pub const MP4_HEADER: &[u8] = b"\0\0\0\x20ftypisom\0\0\x02\0isomiso2avc1mp41";

    /// ffprobe JSON output for a file with one video stream.
    pub fn video_probe_json(
        codec: &str,
        width: u32,
        height: u32,
        frame_rate: &str,
        duration_ms: u64,
        has_audio: bool,
        format_name: &str,
    ) -> String {
        let mut streams = vec![json!({
            "index": 0,
            "codec_name": codec,
            "codec_type": "video",
            "width": width,
            "height": height,
            "r_frame_rate": frame_rate,
            "avg_frame_rate": frame_rate,
        })];
        if has_audio {
            streams.push(json!({
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
            }));
        }

        let probe = json!({
            "streams": streams,
            "format": {
                "format_name": format_name,
                "duration": format!("{:.6}", duration_ms as f64 / 1000.0),
            },
        });
        serde_json::to_string_pretty(&probe).unwrap_or_default()
    }

    /// [`video_probe_json`] split into output lines.
    pub fn video_probe_lines(
        codec: &str,
        width: u32,
        height: u32,
        frame_rate: &str,
        duration_ms: u64,
        has_audio: bool,
        format_name: &str,
    ) -> Vec<String> {
        video_probe_json(codec, width, height, frame_rate, duration_ms, has_audio, format_name)
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// ffprobe output lines for a still image.
    pub fn image_probe_lines(codec: &str, width: u32, height: u32) -> Vec<String> {
        let probe = json!({
            "streams": [{
                "index": 0,
                "codec_name": codec,
                "codec_type": "video",
                "width": width,
                "height": height,
                "r_frame_rate": "25/1",
                "avg_frame_rate": "0/0",
            }],
            "format": {
                "format_name": format!("{}_pipe", codec),
            },
        });
        serde_json::to_string_pretty(&probe)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Gzip compresses `data`.
    pub fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        // Writing to a Vec cannot fail
        let _ = encoder.write_all(data);
        encoder.finish().unwrap_or_default()
    }

    /// A gzip compressed animated sticker document.
    pub fn animation_payload(w: u32, h: u32, fr: f64, ip: f64, op: f64) -> Vec<u8> {
        let document = json!({
            "v": "5.5.2",
            "w": w,
            "h": h,
            "fr": fr,
            "ip": ip,
            "op": op,
            "layers": [],
        });
        gzip(document.to_string().as_bytes())
    }
}
