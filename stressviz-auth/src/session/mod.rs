//! Session Management Module
//!
//! The directory and session store: typed slot access, the service that
//! drives it, and change notifications.

pub mod manager;
mod storage;
pub mod types;

pub use manager::AuthService;
pub use types::*;
