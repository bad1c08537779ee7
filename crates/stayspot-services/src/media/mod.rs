//! Image media for owners: validation, upload and reference replacement.

mod service;
mod validation;

pub use service::MediaService;
pub use validation::{normalize_content_type, sanitize_filename, validate_image};

use bytes::Bytes;
use stayspot_core::{Config, OwnerKind, SetLimits};

/// A decoded image upload as handed over by the route layer.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: String,
    pub original_filename: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            original_filename: None,
        }
    }

    pub fn with_original_filename(mut self, filename: impl Into<String>) -> Self {
        self.original_filename = Some(filename.into());
        self
    }
}

/// Validation and throughput settings applied to every upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_image_size_bytes: usize,
    pub allowed_content_types: Vec<String>,
    /// How many set items upload at once.
    pub upload_concurrency: usize,
    /// Configured ceilings for image sets, by owner kind.
    pub listing_limits: SetLimits,
    pub blog_limits: SetLimits,
}

impl UploadPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_image_size_bytes: config.max_image_size_bytes(),
            allowed_content_types: config.allowed_image_content_types().to_vec(),
            upload_concurrency: config.upload_concurrency().max(1),
            listing_limits: config
                .set_limits(OwnerKind::Listing)
                .unwrap_or_else(SetLimits::listing),
            blog_limits: config
                .set_limits(OwnerKind::BlogPost)
                .unwrap_or_else(SetLimits::blog),
        }
    }

    /// Configured set limits for `kind`; `None` for single-image owners.
    pub fn set_limits(&self, kind: OwnerKind) -> Option<SetLimits> {
        match kind {
            OwnerKind::Listing => Some(self.listing_limits),
            OwnerKind::BlogPost => Some(self.blog_limits),
            OwnerKind::User => None,
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
