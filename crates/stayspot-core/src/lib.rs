//! StaySpot Core Library
//!
//! Domain models, error types and configuration shared by every StaySpot media
//! component: the blob store, the media service and the HTTP gateway.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel, ValidationError};
pub use models::{BlobDescriptor, Metadata, OwnerBinding, OwnerKind, OwnerRef, SetLimits};
pub use storage_types::StorageBackend;
