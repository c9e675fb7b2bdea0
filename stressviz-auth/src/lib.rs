//! Stressviz Auth - Local user directory and session store
//!
//! Keeps registered accounts and the current session inside a durable
//! key-value storage partition and exposes them through an async,
//! server-like interface:
//!
//! - [`AuthService`]: register, login, logout and current-user lookup, with
//!   session change observers
//! - [`backend`]: in-memory and file-backed storage partitions
//! - [`forms`]: the checks consumers run before calling the store
//!
//! There is no transport and no password hashing. Credentials are compared
//! in plaintext, exactly as they are stored, and stored records never leave
//! the crate:
//!
//! ```compile_fail
//! use stressviz_auth::session::storage::AccountSlots;
//! ```

pub mod backend;
pub mod forms;
pub mod session;

pub use backend::{FileStore, MemoryStore};
pub use forms::{FormError, LoginForm, RegistrationForm};
pub use session::{AuthOptions, AuthService, SessionChange, SessionChangeKind, SubscriptionId};

use stressviz_core::StressvizError;

/// Auth store error type
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User with this email already exists")]
    DuplicateEmail { email: String },

    /// Deliberately the same for an unknown email and a wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Core(#[from] StressvizError),

    #[error("Corrupted account data: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn is_duplicate_email(&self) -> bool {
        matches!(self, AuthError::DuplicateEmail { .. })
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials)
    }

    /// Whether the failure came from storage rather than from the caller's input
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, AuthError::Core(_) | AuthError::Serialization(_))
    }
}
