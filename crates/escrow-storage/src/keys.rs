//! Storage key constants.

/// Keys used in durable storage.
pub struct StorageKeys;

impl StorageKeys {
    /// Refresh token. The access token is never persisted.
    pub const REFRESH_TOKEN: &'static str = "refresh_token";
}
