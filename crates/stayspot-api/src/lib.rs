//! StaySpot API Library
//!
//! HTTP surface of the media subsystem: the streaming file gateway, owner image routes,
//! error responses and application setup.

pub mod error;
pub mod gateway;
pub mod handlers;
pub mod setup;
pub mod state;

// Re-exports
pub use error::HttpAppError;
pub use gateway::StreamingGateway;
pub use state::AppState;
pub use stayspot_infra::ErrorResponse;
