//! KYC records and AML checks.

use crate::models::{AmlCheck, KycRecord, NewKycRecord};
use crate::{keys, EscrowApi};
use escrow_auth::{ApiRequest, ClientResult};
use serde_json::json;
use tracing::info;

impl EscrowApi {
    pub async fn list_kyc(&self, escrow_id: i64) -> ClientResult<Vec<KycRecord>> {
        let path = kyc_path(escrow_id);
        self.cache
            .get_or_fetch(keys::kyc(escrow_id), || self.client.get_json(&path, &[]))
            .await
    }

    pub async fn create_kyc(
        &self,
        escrow_id: i64,
        record: &NewKycRecord,
    ) -> ClientResult<KycRecord> {
        let created: KycRecord = self.client.post_json(&kyc_path(escrow_id), record).await?;
        self.invalidate_kyc(escrow_id);
        Ok(created)
    }

    /// Run the AML screening configured for the escrow.
    pub async fn run_aml(&self, escrow_id: i64, record_id: i64) -> ClientResult<AmlCheck> {
        let path = format!("{}{record_id}/run-aml/", kyc_path(escrow_id));
        let check: AmlCheck = self.client.send(ApiRequest::post(path)).await?.json()?;

        self.invalidate_kyc(escrow_id);
        info!(escrow_id, record_id, status = %check.status, "AML check started");
        Ok(check)
    }

    /// Request an AML check from a named provider.
    ///
    /// The endpoint is keyed by record only; `escrow_id` scopes cache invalidation.
    pub async fn create_aml_check(
        &self,
        escrow_id: i64,
        record_id: i64,
        provider: &str,
    ) -> ClientResult<AmlCheck> {
        let path = format!("/kyc/{record_id}/aml-checks/");
        let check: AmlCheck = self
            .client
            .post_json(&path, &json!({ "provider": provider }))
            .await?;

        self.invalidate_kyc(escrow_id);
        Ok(check)
    }

    fn invalidate_kyc(&self, escrow_id: i64) {
        self.invalidate(&[keys::kyc(escrow_id), keys::escrow(escrow_id)]);
    }
}

fn kyc_path(escrow_id: i64) -> String {
    format!("/escrows/{escrow_id}/kyc/")
}
