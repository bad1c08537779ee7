//! Upload fixtures.

use bytes::Bytes;
use stayspot_core::{OwnerBinding, OwnerRef};
use stayspot_services::ImageUpload;

/// 1x1 transparent PNG.
pub const MINIMAL_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub fn png_upload() -> ImageUpload {
    ImageUpload::new(Bytes::from_static(MINIMAL_PNG), "image/png")
}

/// A payload that is not a real image but declares an image type; the store does not
/// inspect bytes.
pub fn labelled_upload(label: &str) -> ImageUpload {
    ImageUpload::new(Bytes::from(label.as_bytes().to_vec()), "image/jpeg")
}

pub fn guest() -> OwnerBinding {
    OwnerBinding::new(OwnerRef::user("guest-1"), "guest-1")
}

pub fn host_listing() -> OwnerBinding {
    OwnerBinding::new(OwnerRef::listing("listing-1"), "host-1")
}

pub fn author_post() -> OwnerBinding {
    OwnerBinding::new(OwnerRef::blog_post("post-1"), "author-1")
}
