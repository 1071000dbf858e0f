//! Process-wide token store.
//!
//! The access token lives only in memory. The refresh token is persisted to
//! durable storage under [`StorageKeys::REFRESH_TOKEN`] so a session survives a
//! restart. Storage failures never surface to callers: they are logged and the
//! refresh token is treated as absent.

use crate::{DurableStorage, StorageKeys};
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Holds the current access token and the persisted refresh token.
pub struct TokenStore {
    access: RwLock<Option<String>>,
    durable: Box<dyn DurableStorage>,
}

impl TokenStore {
    /// Create a token store over the given durable backend.
    pub fn new(durable: Box<dyn DurableStorage>) -> Self {
        Self {
            access: RwLock::new(None),
            durable,
        }
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.access.read().clone()
    }

    /// Replace the in-memory access token.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access.write() = token;
    }

    /// Persisted refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        match self.durable.get(StorageKeys::REFRESH_TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read refresh token, treating as absent");
                None
            }
        }
    }

    /// Persist a refresh token. `None` removes the stored value.
    pub fn set_refresh_token(&self, token: Option<String>) {
        let result = match token {
            Some(token) => self.durable.set(StorageKeys::REFRESH_TOKEN, &token),
            None => self.durable.delete(StorageKeys::REFRESH_TOKEN).map(|_| ()),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist refresh token");
        }
    }

    /// Store a freshly issued token pair.
    pub fn set_tokens(&self, access: &str, refresh: &str) {
        self.set_access_token(Some(access.to_string()));
        self.set_refresh_token(Some(refresh.to_string()));
    }

    /// Remove both tokens.
    pub fn clear(&self) {
        self.set_access_token(None);
        self.set_refresh_token(None);
        debug!("Cleared stored tokens");
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_access", &self.access.read().is_some())
            .finish_non_exhaustive()
    }
}
