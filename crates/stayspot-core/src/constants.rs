//! Shared constants.

pub const MIB: usize = 1024 * 1024;

/// Default chunk size for chunked blob storage (255 KiB).
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 255 * 1024;

pub const DEFAULT_MAX_IMAGE_SIZE_MB: usize = 5;

pub const DEFAULT_MAX_LISTING_PHOTOS: usize = 10;
pub const DEFAULT_MAX_BLOG_IMAGES: usize = 5;

pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 4;

pub const DEFAULT_IMAGE_CONTENT_TYPES: &str =
    "image/jpeg,image/png,image/gif,image/webp,image/avif";

/// Longest blob name accepted from callers.
pub const MAX_BLOB_NAME_LENGTH: usize = 255;
