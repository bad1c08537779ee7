//! Shared blob name generation and validation.
//!
//! Names double as directory names in the local backend, so every backend must accept
//! exactly the same set of names.

use crate::traits::{StorageError, StorageResult};
use stayspot_core::constants::MAX_BLOB_NAME_LENGTH;
use uuid::Uuid;

/// File extension used for store-assigned names.
pub fn extension_for(content_type: &str) -> &'static str {
    let normalized = content_type
        .split(';')
        .next()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    match normalized.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

/// Generate a collision-free blob name: `{uuid}.{ext}`.
pub fn generate_blob_name(content_type: &str) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), extension_for(content_type))
}

/// Whether `name` is acceptable as a blob name.
pub fn is_valid_blob_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_BLOB_NAME_LENGTH
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

/// Validate a caller-assigned blob name.
pub fn validate_blob_name(name: &str) -> StorageResult<()> {
    if is_valid_blob_name(name) {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// Resolve the final name for an upload.
pub fn resolve_blob_name(requested: Option<&str>, content_type: &str) -> StorageResult<String> {
    match requested {
        Some(name) => {
            validate_blob_name(name)?;
            Ok(name.to_string())
        }
        None => Ok(generate_blob_name(content_type)),
    }
}
