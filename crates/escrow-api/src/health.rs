use crate::models::HealthStatus;
use crate::EscrowApi;
use escrow_auth::ClientResult;

impl EscrowApi {
    /// Backend health. Never cached.
    pub async fn health(&self) -> ClientResult<HealthStatus> {
        self.client.get_json("/health/", &[]).await
    }
}
