//! Account Storage - typed access to the users and session slots
//!
//! Both slots hold JSON text. An absent or empty slot reads as "nothing
//! stored". A users slot that fails to parse is an error; a session slot that
//! fails to parse reads as signed out.

use crate::{AuthError, AuthResult};
use std::sync::Arc;
use stressviz_core::{
    EmailMatch, KeyValueStore, PublicUser, StorageEvents, UserRecord, CURRENT_USER_KEY, USERS_KEY,
};
use tracing::{debug, warn};

/// Typed view over the two account slots of a storage partition
#[derive(Clone)]
pub(crate) struct AccountSlots {
    store: Arc<dyn KeyValueStore>,
}

fn parse_users(raw: Option<&str>) -> Result<Vec<UserRecord>, serde_json::Error> {
    match raw {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw),
        _ => Ok(Vec::new()),
    }
}

/// Decode a session slot value; anything unreadable counts as no session
pub(crate) fn parse_session(raw: Option<&str>) -> Option<PublicUser> {
    let raw = raw.filter(|raw| !raw.is_empty())?;

    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Ignoring unreadable session record: {}", e);
            None
        }
    }
}

impl AccountSlots {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All registered accounts in registration order
    pub fn load_users(&self) -> AuthResult<Vec<UserRecord>> {
        let raw = self.store.get(USERS_KEY)?;
        Ok(parse_users(raw.as_deref())?)
    }

    /// Append `record` unless its email is already taken.
    ///
    /// The uniqueness check and the write happen inside one
    /// [`KeyValueStore::update`], so concurrent registrations against the same
    /// partition cannot both pass the check.
    pub fn insert_user(&self, record: UserRecord, email_match: EmailMatch) -> AuthResult<()> {
        let mut record = Some(record);
        let mut outcome: AuthResult<()> = Ok(());

        self.store.update(USERS_KEY, &mut |current| {
            let mut users = match parse_users(current.as_deref()) {
                Ok(users) => users,
                Err(e) => {
                    outcome = Err(AuthError::Serialization(e));
                    return None;
                }
            };

            let candidate = record.take()?;
            if users
                .iter()
                .any(|user| email_match.matches(&user.email, &candidate.email))
            {
                outcome = Err(AuthError::DuplicateEmail {
                    email: candidate.email,
                });
                return None;
            }

            users.push(candidate);
            match serde_json::to_string(&users) {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    outcome = Err(AuthError::Serialization(e));
                    None
                }
            }
        })?;

        outcome
    }

    /// Remove the account with `id`; returns whether one was removed
    pub fn remove_user(&self, id: &str) -> AuthResult<bool> {
        let mut outcome: AuthResult<()> = Ok(());

        let removed = self.store.update(USERS_KEY, &mut |current| {
            let mut users = match parse_users(current.as_deref()) {
                Ok(users) => users,
                Err(e) => {
                    outcome = Err(AuthError::Serialization(e));
                    return None;
                }
            };

            let before = users.len();
            users.retain(|user| user.id != id);
            if users.len() == before {
                return None;
            }

            match serde_json::to_string(&users) {
                Ok(encoded) => Some(encoded),
                Err(e) => {
                    outcome = Err(AuthError::Serialization(e));
                    None
                }
            }
        })?;

        outcome.map(|_| removed)
    }

    /// Find the account whose email and plaintext password both match
    pub fn find_by_credentials(
        &self,
        email: &str,
        password: &str,
        email_match: EmailMatch,
    ) -> AuthResult<Option<PublicUser>> {
        let users = self.load_users()?;

        Ok(users
            .iter()
            .find(|user| email_match.matches(&user.email, email) && user.password == password)
            .map(PublicUser::from))
    }

    /// The current session, if one is stored and readable
    pub fn load_session(&self) -> Option<PublicUser> {
        match self.store.get(CURRENT_USER_KEY) {
            Ok(raw) => parse_session(raw.as_deref()),
            Err(e) => {
                warn!("Failed to read session slot: {}", e);
                None
            }
        }
    }

    pub fn save_session(&self, user: &PublicUser) -> AuthResult<()> {
        let encoded = serde_json::to_string(user)?;
        self.store.set(CURRENT_USER_KEY, &encoded)?;
        debug!(user_id = %user.id, "Saved session");
        Ok(())
    }

    pub fn clear_session(&self) -> AuthResult<()> {
        self.store.remove(CURRENT_USER_KEY)?;
        debug!("Cleared session");
        Ok(())
    }

    /// Writes made to the partition through other handles
    pub fn subscribe(&self) -> StorageEvents {
        self.store.subscribe()
    }
}
