//! Token state owned by one client instance.
//!
//! # Design
//! The access token is the only mutable state in the client. It lives behind
//! a single mutex, and the lazy "acquire if absent" path runs the exchange
//! while holding that lock, so concurrent first calls share one exchange
//! instead of racing to overwrite each other.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque bearer credential. No expiry is tracked.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

#[derive(Debug, Default)]
pub struct Session {
    token: Mutex<Option<AccessToken>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while the lock was held cannot leave the Option half-written.
    fn lock(&self) -> MutexGuard<'_, Option<AccessToken>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn token(&self) -> Option<AccessToken> {
        self.lock().clone()
    }

    pub fn has_token(&self) -> bool {
        self.lock().is_some()
    }

    pub fn store(&self, token: AccessToken) {
        *self.lock() = Some(token);
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Drop the held token only if it is still `token`. Returns whether it
    /// was dropped; a token stored since `token` was read is kept.
    pub fn clear_if(&self, token: &AccessToken) -> bool {
        let mut slot = self.lock();
        if slot.as_ref() == Some(token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Return the held token, or run `acquire` under the lock and keep its
    /// result. A failed `acquire` leaves the session untouched.
    pub fn get_or_acquire<E>(
        &self,
        acquire: impl FnOnce() -> Result<AccessToken, E>,
    ) -> Result<AccessToken, E> {
        let mut slot = self.lock();
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        let token = acquire()?;
        *slot = Some(token.clone());
        Ok(token)
    }
}
