//! Tracing initialization
//!
//! Installs the global `tracing` subscriber. Filtering follows `RUST_LOG` when set.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
