//! Session Types
//!
//! Change notifications and tuning options for the auth store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stressviz_core::{AuthConfig, EmailMatch, PublicUser};

/// What caused the session to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionChangeKind {
    /// A new account was created and signed in
    Registered,
    LoggedIn,
    LoggedOut,
    /// Another handle on the same storage partition rewrote the session
    External,
}

/// Notification sent to session observers after every successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChange {
    pub kind: SessionChangeKind,
    /// The session after the change, `None` when signed out
    pub user: Option<PublicUser>,
    pub at: DateTime<Utc>,
}

impl SessionChange {
    pub fn new(kind: SessionChangeKind, user: Option<PublicUser>) -> Self {
        Self {
            kind,
            user,
            at: Utc::now(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Handle returned by [`crate::AuthService::on_session_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Runtime options for [`crate::AuthService`]
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Pretend round-trip time applied to register and login
    pub latency: Duration,
    pub email_match: EmailMatch,
    /// Capacity of the session change broadcast
    pub event_buffer: usize,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for AuthOptions {
    fn from(config: &AuthConfig) -> Self {
        Self {
            latency: Duration::from_millis(config.simulated_latency_ms),
            email_match: config.email_match,
            event_buffer: config.event_buffer.max(1),
        }
    }
}

impl AuthOptions {
    /// Options with no artificial delay, for tests and scripted use
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_email_match(mut self, email_match: EmailMatch) -> Self {
        self.email_match = email_match;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}
