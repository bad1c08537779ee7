//! Upload validation
//!
//! Everything here runs before the first blob store call, so a rejected upload never
//! writes anything.

use super::{ImageUpload, UploadPolicy};
use stayspot_core::ValidationError;

const MAX_FILENAME_LENGTH: usize = 255;

/// Normalize a MIME type by stripping parameters and lowercasing
/// (e.g. "Image/JPEG; charset=binary" -> "image/jpeg").
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_lowercase()
}

/// Validate one image against the policy and return its normalized content type.
pub fn validate_image(upload: &ImageUpload, policy: &UploadPolicy) -> Result<String, ValidationError> {
    if upload.bytes.is_empty() {
        return Err(ValidationError::Empty);
    }

    if upload.bytes.len() > policy.max_image_size_bytes {
        return Err(ValidationError::TooLarge {
            size: upload.bytes.len(),
            max: policy.max_image_size_bytes,
        });
    }

    let normalized = normalize_content_type(&upload.content_type);
    let allowed = normalized.starts_with("image/")
        && policy
            .allowed_content_types
            .iter()
            .any(|ct| ct.eq_ignore_ascii_case(&normalized));

    if !allowed {
        return Err(ValidationError::UnsupportedContentType {
            content_type: upload.content_type.clone(),
            allowed: policy.allowed_content_types.join(", "),
        });
    }

    Ok(normalized)
}

/// Reduce a client-declared filename to a safe informational label.
///
/// Keeps only the final path component and maps every character outside
/// `[A-Za-z0-9._-]` to `_`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let filename_only = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename)
        .trim();

    let sanitized: String = filename_only
        .chars()
        .take(MAX_FILENAME_LENGTH)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.' || c == '_') {
        return None;
    }

    Some(sanitized)
}
