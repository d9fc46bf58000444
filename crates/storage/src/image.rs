//! Image upload policy: accepted media types, key naming, content types.

use crate::error::{StorageError, StorageResult};

/// Media types accepted for record images.
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
];

/// Check a declared media type and the payload size.
pub fn validate_image(content_type: &str, size: usize, max_size: usize) -> StorageResult<()> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&media_type.as_str()) {
        return Err(StorageError::UnsupportedMediaType(content_type.to_string()));
    }
    if size > max_size {
        return Err(StorageError::TooLarge {
            size,
            max: max_size,
        });
    }
    Ok(())
}

/// Make a client file name safe to use as a storage key.
///
/// Whitespace runs become `-` and anything outside `[A-Za-z0-9.-]` is
/// removed. Leading dots are stripped so keys are never hidden files.
pub fn sanitize_file_name(name: &str) -> String {
    let dashed = name.split_whitespace().collect::<Vec<_>>().join("-");
    let safe: String = dashed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '-')
        .collect();
    let safe = safe.trim_start_matches('.');
    if safe.is_empty() {
        "image".to_string()
    } else {
        safe.to_string()
    }
}

/// Build a blob key: the upload time in milliseconds, then the sanitized name.
pub fn image_key(suggested_name: &str, unix_millis: i128) -> String {
    format!("{unix_millis}-{}", sanitize_file_name(suggested_name))
}

/// Content type to serve for a stored key, from its extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
