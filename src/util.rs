//! Text decoding, media sniffing and formatting helpers.

use std::borrow::Cow;

use encoding_rs::Encoding;

// ============================================================================
// Encodings
// ============================================================================

/// Decode bytes to a string, handling various encodings.
///
/// 1. Valid UTF-8 (BOM handled by encoding_rs) is returned as is
/// 2. Otherwise the hint encoding is used, when it names a known encoding
/// 3. Otherwise Windows-1251, the usual encoding of legacy FB2 and INPX data
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(encoding) = hint_encoding.and_then(encoding_for_label) {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1251.decode(bytes);
    result
}

/// Resolve an encoding label such as `"windows-1251"` or `"cp1251"`.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Extract the encoding named in an XML declaration.
///
/// Only the first 200 bytes are inspected; a UTF-8 byte order mark before
/// `<?xml` is tolerated.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(200)];

    let xml_start = memchr::memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];
    let decl_end = memchr::memmem::find(after_xml, b"?>").unwrap_or(after_xml.len());
    let decl = &after_xml[..decl_end];

    let enc_pos = decl
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"encoding"))?;
    let after_enc = decl[enc_pos + 8..].trim_ascii_start();
    let after_eq = after_enc.strip_prefix(b"=")?.trim_ascii_start();

    let (&quote, value) = after_eq.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value_end = value.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&value[..value_end]).ok()
}

// ============================================================================
// Resource Format Detection
// ============================================================================

/// Media formats found in ebook resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
    Binary,
}

impl MediaFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Binary => "application/octet-stream",
        }
    }
}

/// Detect a resource format by extension, then by magic bytes.
pub fn detect_media_format(path: &str, data: &[u8]) -> MediaFormat {
    let path_lower = path.to_lowercase();

    if path_lower.ends_with(".jpg") || path_lower.ends_with(".jpeg") {
        return MediaFormat::Jpeg;
    }
    if path_lower.ends_with(".png") {
        return MediaFormat::Png;
    }
    if path_lower.ends_with(".gif") {
        return MediaFormat::Gif;
    }
    if path_lower.ends_with(".svg") {
        return MediaFormat::Svg;
    }
    if path_lower.ends_with(".webp") {
        return MediaFormat::WebP;
    }

    if data.starts_with(&[0xFF, 0xD8]) {
        return MediaFormat::Jpeg;
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        return MediaFormat::Png;
    }
    if data.starts_with(b"GIF8") {
        return MediaFormat::Gif;
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return MediaFormat::WebP;
    }

    MediaFormat::Binary
}

/// MIME type by extension or magic bytes; `None` if unknown.
pub fn detect_mime_type(filename: &str, data: &[u8]) -> Option<&'static str> {
    match detect_media_format(filename, data) {
        MediaFormat::Binary => None,
        other => Some(other.mime_type()),
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Binary-prefixed size, e.g. `1.5 KiB`. Sizes under 1 KiB are printed in
/// bytes.
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}iB", UNITS[unit])
}

// ============================================================================
// Tests
// ============================================================================
