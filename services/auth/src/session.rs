//! Session persistence over the two storage scopes
//!
//! A session lives either in durable storage (the "remember me" choice) or
//! in session-scoped storage, never in both. Restoring prefers the
//! session-scoped copy when both happen to exist.

use common::storage::KeyValueStorage;
use tracing::{info, warn};

use crate::error::AuthResult;
use crate::models::Session;

/// Storage backend usable by the session store
pub type BoxedStorage = Box<dyn KeyValueStorage + Send>;

/// Session store owning both storage scopes and the remember preference
pub struct SessionStore {
    key: String,
    durable: BoxedStorage,
    ephemeral: BoxedStorage,
    remember: bool,
}

impl SessionStore {
    /// Create a new session store
    ///
    /// The remember preference starts out as "a durable session exists".
    pub fn new(key: impl Into<String>, durable: BoxedStorage, ephemeral: BoxedStorage) -> Self {
        let key = key.into();
        let remember = match durable.get(&key) {
            Ok(value) => value.is_some(),
            Err(e) => {
                warn!("Failed to inspect durable session storage: {}", e);
                false
            }
        };

        Self {
            key,
            durable,
            ephemeral,
            remember,
        }
    }

    /// Whether sessions are persisted durably
    pub fn remember(&self) -> bool {
        self.remember
    }

    /// Persist a session in the location chosen by the remember preference
    pub fn persist(&mut self, session: &Session) -> AuthResult<()> {
        let record = serde_json::to_string(session)
            .map_err(common::error::StorageError::from)?;

        if self.remember {
            self.durable.set(&self.key, &record)?;
            self.ephemeral.remove(&self.key)?;
        } else {
            self.ephemeral.set(&self.key, &record)?;
            self.durable.remove(&self.key)?;
        }

        info!(
            "Persisted session for {} ({})",
            session.login(),
            if self.remember { "durable" } else { "session-scoped" }
        );
        Ok(())
    }

    /// Restore a previously persisted session, if any
    ///
    /// Unreadable or invalid records are discarded.
    pub fn restore(&mut self) -> Option<Session> {
        let key = self.key.clone();
        for (scope, storage) in [
            ("session-scoped", &mut self.ephemeral),
            ("durable", &mut self.durable),
        ] {
            let record = match storage.get(&key) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to read {} session storage: {}", scope, e);
                    continue;
                }
            };

            match serde_json::from_str::<Session>(&record) {
                Ok(session) if session.is_valid() => {
                    info!("Restored {} session for {}", scope, session.login());
                    return Some(session);
                }
                Ok(_) => warn!("Discarding {} session without login", scope),
                Err(e) => warn!("Discarding unreadable {} session: {}", scope, e),
            }

            if let Err(e) = storage.remove(&key) {
                warn!("Failed to discard {} session: {}", scope, e);
            }
        }

        None
    }

    /// Remove the session from both locations
    ///
    /// Both removals are attempted; the first failure is reported.
    pub fn clear(&mut self) -> AuthResult<()> {
        let durable = self.durable.remove(&self.key);
        let ephemeral = self.ephemeral.remove(&self.key);
        info!("Cleared stored session");
        durable?;
        ephemeral?;
        Ok(())
    }

    /// Change the remember preference, migrating the current session
    pub fn set_remember(&mut self, remember: bool, current: Option<&Session>) -> AuthResult<()> {
        self.remember = remember;
        match current {
            Some(session) => self.persist(session),
            None => Ok(()),
        }
    }

    /// Durable storage scope
    pub fn durable(&self) -> &dyn KeyValueStorage {
        self.durable.as_ref()
    }

    /// Session-scoped storage scope
    pub fn ephemeral(&self) -> &dyn KeyValueStorage {
        self.ephemeral.as_ref()
    }

    /// Storage key of the session record
    pub fn key(&self) -> &str {
        &self.key
    }
}
