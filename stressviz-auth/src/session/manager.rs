//! Auth Service - the directory and session store
//!
//! Register, login, logout and current-user lookup over one storage
//! partition, with session change observers in place of a global event.

use super::storage::{parse_session, AccountSlots};
use super::{AuthOptions, SessionChange, SessionChangeKind, SubscriptionId};
use crate::AuthResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use stressviz_core::{
    simulate_latency, AuthState, KeyValueStore, PublicUser, StorageNotice, UserRecord,
    CURRENT_USER_KEY,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type SessionCallback = Arc<dyn Fn(&SessionChange) + Send + Sync>;

/// Local user directory and session manager
pub struct AuthService {
    slots: AccountSlots,
    options: AuthOptions,
    /// Session changes for async subscribers
    changes: broadcast::Sender<SessionChange>,
    /// Synchronous callbacks registered with `on_session_change`
    observers: Mutex<Vec<(SubscriptionId, SessionCallback)>>,
    next_subscription: AtomicU64,
}

impl AuthService {
    /// Create a store over `storage` with the given options
    pub fn new(storage: Arc<dyn KeyValueStore>, options: AuthOptions) -> Self {
        let (changes, _) = broadcast::channel(options.event_buffer.max(1));

        Self {
            slots: AccountSlots::new(storage),
            options,
            changes,
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// Create an account and sign it in.
    ///
    /// The store performs no format checks; see [`crate::RegistrationForm`].
    /// If the session cannot be written the new account is removed again.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> AuthResult<PublicUser> {
        simulate_latency(self.options.latency, "register").await;

        let record = UserRecord::new(name, email, password);
        let user = record.to_public();

        if let Err(e) = self.slots.insert_user(record, self.options.email_match) {
            if e.is_duplicate_email() {
                info!("Registration rejected: email already registered");
            } else {
                warn!("Registration failed: {}", e);
            }
            return Err(e);
        }

        if let Err(e) = self.slots.save_session(&user) {
            warn!(user_id = %user.id, "Registration failed, rolling back account: {}", e);
            if let Err(rollback) = self.slots.remove_user(&user.id) {
                error!(user_id = %user.id, "Failed to roll back account: {}", rollback);
            }
            return Err(e);
        }
        info!(user_id = %user.id, "Registered new account");

        self.notify(SessionChange::new(
            SessionChangeKind::Registered,
            Some(user.clone()),
        ));
        Ok(user)
    }

    /// Sign in with an exact email and plaintext password match
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<PublicUser> {
        simulate_latency(self.options.latency, "login").await;

        let user = self
            .slots
            .find_by_credentials(email, password, self.options.email_match)?
            .ok_or_else(|| {
                info!("Login rejected: invalid credentials");
                crate::AuthError::InvalidCredentials
            })?;

        self.slots.save_session(&user)?;
        info!(user_id = %user.id, "Signed in");

        self.notify(SessionChange::new(
            SessionChangeKind::LoggedIn,
            Some(user.clone()),
        ));
        Ok(user)
    }

    /// Clear the current session. Signing out while signed out is fine.
    pub fn logout(&self) -> AuthResult<()> {
        self.slots.clear_session()?;
        info!("Signed out");

        self.notify(SessionChange::new(SessionChangeKind::LoggedOut, None));
        Ok(())
    }

    /// The signed-in user; unreadable session data counts as signed out
    pub fn get_current_user(&self) -> Option<PublicUser> {
        self.slots.load_session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.get_current_user().is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState::from(self.get_current_user())
    }

    /// Register a callback run after every session change.
    ///
    /// Callbacks run synchronously on the task that made the change.
    pub fn on_session_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SessionChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        match self.observers.lock() {
            Ok(mut observers) => observers.push((id, Arc::new(callback))),
            Err(poisoned) => poisoned.into_inner().push((id, Arc::new(callback))),
        }
        debug!(subscription = id.0, "Added session observer");
        id
    }

    /// Remove a callback; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = match self.observers.lock() {
            Ok(observers) => observers,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Receive session changes asynchronously
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    /// Forward session writes made through other handles of the partition to
    /// this service's observers as [`SessionChangeKind::External`].
    ///
    /// Must be called from within a Tokio runtime. The task ends when the
    /// service is dropped or the partition goes away.
    pub fn spawn_storage_relay(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.slots.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            while let Some(notice) = events.next_notice().await {
                let user = match notice {
                    StorageNotice::Write(event) if event.key == CURRENT_USER_KEY => {
                        debug!(writer = event.writer, "Session changed elsewhere");
                        parse_session(event.new_value.as_deref())
                    }
                    StorageNotice::Write(_) => continue,
                    StorageNotice::Missed(skipped) => {
                        // A dropped write may have been the session; re-read it
                        debug!(skipped, "Re-reading session after missed storage events");
                        let Some(service) = weak.upgrade() else {
                            break;
                        };
                        service.get_current_user()
                    }
                };

                let Some(service) = weak.upgrade() else {
                    break;
                };
                service.notify(SessionChange::new(SessionChangeKind::External, user));
            }
        })
    }

    fn notify(&self, change: SessionChange) {
        let callbacks: Vec<SessionCallback> = match self.observers.lock() {
            Ok(observers) => observers.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(poisoned) => poisoned
                .into_inner()
                .iter()
                .map(|(_, cb)| Arc::clone(cb))
                .collect(),
        };

        for callback in callbacks {
            callback(&change);
        }

        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}
