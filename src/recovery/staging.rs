//! Tab-scoped ephemeral staging for recovery grants.
//!
//! Staged tokens live only until the password-change form consumes them or
//! the tab goes away. They are deliberately kept out of the session store: a
//! recovery grant is never promoted to a persistent session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const RECOVERY_ACCESS_TOKEN_KEY: &str = "recovery_access_token";
pub const RECOVERY_REFRESH_TOKEN_KEY: &str = "recovery_refresh_token";

/// Key/value storage scoped to a single tab (sessionStorage semantics).
pub trait EphemeralStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory tab-scoped storage.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl EphemeralStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(key);
    }
}

/// A staged one-time token pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedGrant {
    pub access_token: String,
    pub refresh_token: String,
}

/// Typed view over the two staging keys. Cloneable so the handshake that
/// stages a grant and the form that consumes it share one tab's storage.
#[derive(Clone)]
pub struct RecoveryStaging {
    storage: Arc<dyn EphemeralStorage>,
}

impl RecoveryStaging {
    #[must_use]
    pub fn new(storage: Arc<dyn EphemeralStorage>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    /// Stage a validated grant for one-time use.
    pub fn stage(&self, access_token: &str, refresh_token: &str) {
        self.storage.set(RECOVERY_ACCESS_TOKEN_KEY, access_token);
        self.storage.set(RECOVERY_REFRESH_TOKEN_KEY, refresh_token);
    }

    /// Read the staged grant without consuming it, so a failed password
    /// change can be retried.
    #[must_use]
    pub fn peek(&self) -> Option<StagedGrant> {
        let access_token = self.storage.get(RECOVERY_ACCESS_TOKEN_KEY)?;
        let refresh_token = self.storage.get(RECOVERY_REFRESH_TOKEN_KEY)?;
        Some(StagedGrant {
            access_token,
            refresh_token,
        })
    }

    #[must_use]
    pub fn has_grant(&self) -> bool {
        self.peek().is_some()
    }

    /// Remove both keys (on success or on navigating away).
    pub fn clear(&self) {
        self.storage.remove(RECOVERY_ACCESS_TOKEN_KEY);
        self.storage.remove(RECOVERY_REFRESH_TOKEN_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_peek_round_trip() {
        let staging = RecoveryStaging::in_memory();
        assert!(!staging.has_grant());

        staging.stage("abc", "def");
        assert_eq!(
            staging.peek(),
            Some(StagedGrant {
                access_token: "abc".to_string(),
                refresh_token: "def".to_string(),
            })
        );
        // Peek does not consume.
        assert!(staging.has_grant());
    }

    #[test]
    fn clear_removes_both_keys() {
        let staging = RecoveryStaging::in_memory();
        staging.stage("abc", "def");
        staging.clear();
        assert!(staging.peek().is_none());
    }

    #[test]
    fn half_staged_grant_is_not_a_grant() {
        let storage = Arc::new(MemoryStorage::default());
        storage.set(RECOVERY_ACCESS_TOKEN_KEY, "abc");
        let staging = RecoveryStaging::new(storage);
        assert!(staging.peek().is_none());
    }
}
