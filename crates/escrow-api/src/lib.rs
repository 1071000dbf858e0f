//! Typed REST resources for the escrow backend.
//!
//! Every call goes through [`escrow_auth::ApiClient`], so requests carry the
//! session's bearer token and recover from an expired access token. Reads are
//! cached in a [`QueryCache`]; mutations invalidate the affected keys.

mod brokers;
mod cache;
mod commission;
mod documents;
mod escrows;
mod health;
mod kyc;
mod models;

#[cfg(test)]
mod testing;

pub use cache::{QueryCache, QueryKey};
pub use models::*;

use escrow_auth::ApiClient;

/// Cache keys shared by the resource modules.
pub mod keys {
    use crate::QueryKey;

    pub fn escrows(status: Option<&str>) -> QueryKey {
        QueryKey::new(["escrows"]).push_or_all(status)
    }

    pub fn all_escrows() -> QueryKey {
        QueryKey::new(["escrows"])
    }

    pub fn escrow(escrow_id: i64) -> QueryKey {
        QueryKey::new(["escrow"]).push(escrow_id)
    }

    pub fn parties(escrow_id: i64) -> QueryKey {
        escrow(escrow_id).push("parties")
    }

    pub fn brokers(escrow_id: i64) -> QueryKey {
        escrow(escrow_id).push("brokers")
    }

    pub fn commission_pool(escrow_id: i64) -> QueryKey {
        escrow(escrow_id).push("commission-pool")
    }

    pub fn documents(escrow_id: i64) -> QueryKey {
        escrow(escrow_id).push("documents")
    }

    pub fn kyc(escrow_id: i64) -> QueryKey {
        escrow(escrow_id).push("kyc")
    }
}

/// Escrow API facade.
#[derive(Clone, Debug)]
pub struct EscrowApi {
    client: ApiClient,
    cache: QueryCache,
}

impl EscrowApi {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            cache: QueryCache::new(),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            self.cache.invalidate(key);
        }
    }
}
