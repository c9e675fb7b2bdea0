//! Stressviz Core - Shared data structures and trait definitions
//!
//! Account types, the storage partition abstraction, errors, configuration
//! and logging used by the auth store and its consumers.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use tokio;
pub use tracing;
