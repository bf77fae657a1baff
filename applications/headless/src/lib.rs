//! musik Headless
//!
//! Terminal harness for the playback core: a synthetic library, a simulated
//! transport and the playback service, driven by commands read from stdin.
//!
//! This library exposes the components for testing purposes.

pub mod commands;
pub mod config;
pub mod error;
pub mod player;
pub mod remote;

// Re-export commonly used types for convenience
pub use commands::Command;
pub use config::{HeadlessConfig, LibrarySettings};
pub use error::{HeadlessError, Result};
pub use player::{Player, Reply, Status};
pub use remote::LoggingRemote;
