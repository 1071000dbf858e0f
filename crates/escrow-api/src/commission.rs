//! Commission pool for an escrow.

use crate::models::{CommissionPool, CommissionPoolUpdate};
use crate::{keys, EscrowApi};
use escrow_auth::{ApiRequest, ClientResult};
use tracing::info;

impl EscrowApi {
    pub async fn get_commission_pool(&self, escrow_id: i64) -> ClientResult<CommissionPool> {
        let path = commission_path(escrow_id);
        self.cache
            .get_or_fetch(keys::commission_pool(escrow_id), || {
                self.client.get_json(&path, &[])
            })
            .await
    }

    /// Update the pool total or its shares.
    pub async fn update_commission_pool(
        &self,
        escrow_id: i64,
        update: &CommissionPoolUpdate,
    ) -> ClientResult<CommissionPool> {
        let pool: CommissionPool = self
            .client
            .patch_json(&commission_path(escrow_id), update)
            .await?;

        self.invalidate(&[keys::commission_pool(escrow_id), keys::brokers(escrow_id)]);
        Ok(pool)
    }

    /// Lock the pool. The server rejects further share changes afterwards.
    pub async fn lock_commission_pool(&self, escrow_id: i64) -> ClientResult<CommissionPool> {
        let path = format!("{}lock/", commission_path(escrow_id));
        let pool: CommissionPool = self.client.send(ApiRequest::post(path)).await?.json()?;

        self.invalidate(&[keys::commission_pool(escrow_id), keys::all_escrows()]);
        info!(escrow_id, "Commission pool locked");
        Ok(pool)
    }
}

fn commission_path(escrow_id: i64) -> String {
    format!("/escrows/{escrow_id}/commission-pool/")
}
