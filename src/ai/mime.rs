//! Image format sniffing for uploads that arrive without a declared type.

use crate::models::DEFAULT_MIME_TYPE;

pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x47, 0x49, 0x46, 0x38, ..] => "image/gif",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized image format (first 4 bytes: {:02X?}), falling back to {}",
                &bytes[..bytes.len().min(4)],
                DEFAULT_MIME_TYPE
            );
            DEFAULT_MIME_TYPE
        }
    }
}

/// Use the declared mime type when it names an image, otherwise sniff the bytes.
pub fn resolve_image_mime(declared: Option<&str>, bytes: &[u8]) -> String {
    match declared.map(str::trim) {
        Some(mime) if mime.starts_with("image/") => mime.to_string(),
        _ => detect_image_mime(bytes).to_string(),
    }
}
