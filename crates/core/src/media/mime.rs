//! Content-based MIME type detection.
//!
//! Only the leading bytes of a file are inspected; names and extensions are
//! never trusted.

use std::path::Path;
use tokio::io::AsyncReadExt;

use super::error::MediaError;
use super::types::{DetectedMedia, MediaCategory};

/// Number of leading bytes read for detection.
const SNIFF_LENGTH: u64 = 4096;

const OCTET_STREAM: &str = "application/octet-stream";
const ANIMATION_MIME_TYPE: &str = "application/gzip";

/// Types that go through the video transcoding path, GIFs included.
const VIDEO_MIME_TYPES: &[&str] = &[
    "image/gif",
    "video/quicktime",
    "video/webm",
    "video/mp4",
    "video/x-m4v",
    "video/x-matroska",
    "video/x-msvideo",
];

/// Legacy QuickTime files start with one of these atoms instead of `ftyp`.
const QUICKTIME_ATOMS: &[&[u8; 4]] = &[b"moov", b"mdat", b"wide", b"free", b"skip", b"pnot"];

/// Reads the beginning of `path` and detects its MIME type and category.
pub async fn detect(path: &Path) -> Result<DetectedMedia, MediaError> {
    let header = read_header(path)
        .await
        .map_err(|e| MediaError::file_operation("read", path, e))?;

    let mime_type = sniff(&header);
    Ok(DetectedMedia {
        mime_type,
        category: category_of(mime_type),
    })
}

async fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut header = Vec::with_capacity(SNIFF_LENGTH as usize);
    file.take(SNIFF_LENGTH).read_to_end(&mut header).await?;
    Ok(header)
}

/// Maps a MIME type to the conversion path it takes.
pub fn category_of(mime_type: &str) -> MediaCategory {
    if VIDEO_MIME_TYPES.contains(&mime_type) {
        MediaCategory::Video
    } else if mime_type == ANIMATION_MIME_TYPE {
        MediaCategory::Animation
    } else if mime_type.starts_with("image/") {
        MediaCategory::Image
    } else {
        MediaCategory::Unsupported
    }
}

/// Detects the MIME type of a file from its leading bytes.
pub fn sniff(header: &[u8]) -> &'static str {
    if header.is_empty() {
        return OCTET_STREAM;
    }

    if header.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return "image/gif";
    }
    if let Some(mime_type) = riff(header) {
        return mime_type;
    }
    if header.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return ebml(header);
    }
    if let Some(mime_type) = iso_media(header) {
        return mime_type;
    }
    if header.starts_with(&[0x1F, 0x8B]) {
        return ANIMATION_MIME_TYPE;
    }
    if header.starts_with(b"8BPS") {
        return "image/vnd.adobe.photoshop";
    }
    if header.starts_with(b"II*\0") || header.starts_with(b"MM\0*") {
        return "image/tiff";
    }
    if header.len() >= 6 && header.starts_with(&[0, 0, 1, 0]) && header[4..6] != [0, 0] {
        return "image/vnd.microsoft.icon";
    }
    if header.len() >= 14 && header.starts_with(b"BM") && header[6..10] == [0; 4] {
        return "image/bmp";
    }
    if header.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if header.starts_with(b"PK\x03\x04") {
        return "application/zip";
    }
    if header.starts_with(b"OggS") {
        return "audio/ogg";
    }

    match as_text(header) {
        Some(text) => text_type(text),
        None => OCTET_STREAM,
    }
}

fn riff(header: &[u8]) -> Option<&'static str> {
    if header.len() < 12 || !header.starts_with(b"RIFF") {
        return None;
    }

    match &header[8..12] {
        b"WEBP" => Some("image/webp"),
        b"AVI " => Some("video/x-msvideo"),
        b"WAVE" => Some("audio/vnd.wave"),
        _ => None,
    }
}

/// Tells WebM apart from other Matroska files by the EBML DocType.
fn ebml(header: &[u8]) -> &'static str {
    let head = &header[..header.len().min(64)];
    if head.windows(4).any(|window| window == b"webm") {
        "video/webm"
    } else {
        "video/x-matroska"
    }
}

/// ISO base media files (MP4, QuickTime, HEIF) identified by their major brand.
fn iso_media(header: &[u8]) -> Option<&'static str> {
    if header.len() < 12 {
        return None;
    }

    let box_type = &header[4..8];
    if box_type != b"ftyp" {
        return QUICKTIME_ATOMS
            .iter()
            .any(|atom| box_type == *atom)
            .then_some("video/quicktime");
    }

    let mime_type = match &header[8..12] {
        b"qt  " => "video/quicktime",
        b"M4V " | b"M4VH" | b"M4VP" => "video/x-m4v",
        b"M4A " | b"M4B " | b"M4P " => "audio/mp4",
        b"avif" | b"avis" => "image/avif",
        b"heic" | b"heix" | b"heim" | b"heis" | b"mif1" | b"msf1" => "image/heic",
        brand if brand.starts_with(b"3g") => "video/3gpp",
        _ => "video/mp4",
    };
    Some(mime_type)
}

/// Returns the header as text when it looks like UTF-8 without binary control bytes.
fn as_text(header: &[u8]) -> Option<&str> {
    let header = header.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(header);

    let text = match std::str::from_utf8(header) {
        Ok(text) => text,
        // The read may have cut a multi-byte character in half
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&header[..e.valid_up_to()]).ok()?,
        Err(_) => return None,
    };

    let binary = text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r' | '\x0c' | '\x1b'));
    (!binary).then_some(text)
}

fn text_type(text: &str) -> &'static str {
    let trimmed = text.trim_start();
    if trimmed.starts_with('<') && text.contains("<svg") {
        "image/svg+xml"
    } else if trimmed.starts_with("<?xml") {
        "application/xml"
    } else {
        "text/plain"
    }
}
