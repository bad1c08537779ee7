//! Data models for the media subsystem
//!
//! Blob descriptors live in [`blob`]; owning-record references and upload limits in
//! [`owner`].

mod blob;
mod owner;

pub use blob::*;
pub use owner::*;
