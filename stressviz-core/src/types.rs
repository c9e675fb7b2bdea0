//! Account and storage data structures

use serde::{Deserialize, Serialize};

/// Storage key holding the JSON array of registered [`UserRecord`]s
pub const USERS_KEY: &str = "stress_visualizer_users";

/// Storage key holding the JSON-encoded [`PublicUser`] of the current session
pub const CURRENT_USER_KEY: &str = "stress_visualizer_current_user";

/// A registered account as persisted in the users slot.
///
/// The password is stored in plaintext. This type never leaves the auth
/// store; callers only ever see [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

impl UserRecord {
    /// Create a record with a freshly generated UUID v4 identifier
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// User identity safe to expose to callers; also the session slot payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&UserRecord> for PublicUser {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
        }
    }
}

/// How emails are compared for uniqueness and login lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMatch {
    /// Byte-for-byte comparison
    #[default]
    Exact,
    /// ASCII and Unicode lowercase comparison
    CaseInsensitive,
}

impl EmailMatch {
    pub fn matches(&self, stored: &str, candidate: &str) -> bool {
        match self {
            EmailMatch::Exact => stored == candidate,
            EmailMatch::CaseInsensitive => stored.to_lowercase() == candidate.to_lowercase(),
        }
    }
}

/// The two states of a storage partition's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated(PublicUser),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&PublicUser> {
        match self {
            AuthState::Anonymous => None,
            AuthState::Authenticated(user) => Some(user),
        }
    }
}

impl From<Option<PublicUser>> for AuthState {
    fn from(user: Option<PublicUser>) -> Self {
        user.map_or(AuthState::Anonymous, AuthState::Authenticated)
    }
}

/// A write observed on a storage partition.
///
/// `new_value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
    /// Identifier of the handle that performed the write
    pub writer: u64,
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressvizConfig {
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

/// Which backend holds the storage partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the file backend; a leading `~` expands to the home dir
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Artificial delay applied to register and login
    pub simulated_latency_ms: u64,
    pub email_match: EmailMatch,
    /// Minimum length enforced by the registration form
    pub min_password_length: usize,
    /// Capacity of the session change broadcast channel
    pub event_buffer: usize,
}
