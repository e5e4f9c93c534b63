//! Session token access for authenticated connects.
//!
//! The token is owned by the embedding application's session layer; the
//! connection manager only ever reads it, fresh on each connect attempt, and
//! appends it to the endpoint as a `token` query parameter. An absent token is
//! not an error: the connect proceeds unauthenticated and the backend decides
//! whether to accept it.

use std::sync::RwLock;

use secrecy::SecretString;

/// Read-only accessor for the current session token.
pub trait TokenStore: Send + Sync + 'static {
    /// The current bearer token, if a session is active.
    fn token(&self) -> Option<SecretString>;
}

/// In-memory token store.
///
/// The process-local stand-in for the browser's localStorage-backed session
/// store. The application sets and clears the token as the session changes;
/// the connection manager observes whatever is current at connect time.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<SecretString>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored token.
    pub fn set_token(&self, token: SecretString) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token);
        }
    }

    /// Drop the stored token; subsequent connects are unauthenticated.
    pub fn clear_token(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<SecretString> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret as _;

    use super::*;

    #[test]
    fn starts_without_token() {
        let store = MemoryTokenStore::new();
        assert!(store.token().is_none(), "fresh store must be empty");
    }

    #[test]
    fn set_and_clear_round_trip() {
        let store = MemoryTokenStore::new();

        store.set_token(SecretString::from("bearer-123".to_owned()));
        let token = store.token().expect("token should be present");
        assert_eq!(token.expose_secret(), "bearer-123");

        store.clear_token();
        assert!(store.token().is_none(), "cleared store must be empty");
    }
}
