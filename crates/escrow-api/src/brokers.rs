//! Broker representations on an escrow.

use crate::models::{BrokerFilters, BrokerInvite, BrokerRepresentation};
use crate::{keys, EscrowApi};
use escrow_auth::ClientResult;
use serde_json::json;
use tracing::info;

impl EscrowApi {
    pub async fn list_brokers(
        &self,
        escrow_id: i64,
        filters: &BrokerFilters,
    ) -> ClientResult<Vec<BrokerRepresentation>> {
        let path = format!("/escrows/{escrow_id}/brokers/");
        let mut query = Vec::new();
        if let Some(invited_as) = &filters.invited_as {
            query.push(("invited_as", invited_as.clone()));
        }
        if let Some(status) = &filters.status {
            query.push(("status", status.clone()));
        }

        let key = keys::brokers(escrow_id)
            .push_or_all(filters.invited_as.as_deref())
            .push_or_all(filters.status.as_deref());

        self.cache
            .get_or_fetch(key, || self.client.get_json(&path, &query))
            .await
    }

    pub async fn invite_broker(
        &self,
        escrow_id: i64,
        invite: &BrokerInvite,
    ) -> ClientResult<BrokerRepresentation> {
        let path = format!("/escrows/{escrow_id}/brokers/");
        let created: BrokerRepresentation = self.client.post_json(&path, invite).await?;

        self.invalidate(&[keys::brokers(escrow_id), keys::escrow(escrow_id)]);
        info!(escrow_id, broker_id = created.id, "Broker invited");
        Ok(created)
    }

    /// Accept or decline an invitation. `status` is the new invitation status.
    pub async fn respond_to_invitation(
        &self,
        escrow_id: i64,
        broker_id: i64,
        status: &str,
    ) -> ClientResult<BrokerRepresentation> {
        let path = format!("/escrows/{escrow_id}/brokers/{broker_id}/");
        let updated: BrokerRepresentation = self
            .client
            .patch_json(&path, &json!({ "status": status }))
            .await?;

        // Accepting changes which escrows the user can see.
        self.invalidate(&[
            keys::brokers(escrow_id),
            keys::all_escrows(),
            keys::escrow(escrow_id),
        ]);
        Ok(updated)
    }
}
