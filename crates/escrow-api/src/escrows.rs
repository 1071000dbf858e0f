//! Escrows and their parties.

use crate::models::{AgreementFile, Escrow, NewEscrow, NewParty, Page, Party, PartyUpdate};
use crate::{keys, EscrowApi};
use escrow_auth::{ClientResult, FormField};
use serde_json::Value;
use tracing::info;

impl EscrowApi {
    pub async fn list_escrows(&self, status: Option<&str>) -> ClientResult<Page<Escrow>> {
        let query: Vec<(&str, String)> = status
            .map(|s| vec![("status", s.to_string())])
            .unwrap_or_default();

        self.cache
            .get_or_fetch(keys::escrows(status), || {
                self.client.get_json("/escrows/", &query)
            })
            .await
    }

    pub async fn get_escrow(&self, escrow_id: i64) -> ClientResult<Escrow> {
        let path = format!("/escrows/{escrow_id}/");
        self.cache
            .get_or_fetch(keys::escrow(escrow_id), || self.client.get_json(&path, &[]))
            .await
    }

    /// Create an escrow. Sent as multipart when an agreement file is attached.
    pub async fn create_escrow(&self, payload: &NewEscrow) -> ClientResult<Escrow> {
        let escrow: Escrow = match &payload.agreement_upload {
            Some(file) => {
                let fields = multipart_fields(payload, file)?;
                self.client.post_multipart("/escrows/", fields).await?
            }
            None => self.client.post_json("/escrows/", payload).await?,
        };

        self.invalidate(&[keys::all_escrows()]);
        info!(escrow_id = escrow.id, "Escrow created");
        Ok(escrow)
    }

    pub async fn list_parties(
        &self,
        escrow_id: i64,
        role: Option<&str>,
    ) -> ClientResult<Vec<Party>> {
        let path = format!("/escrows/{escrow_id}/parties/");
        let query: Vec<(&str, String)> = role
            .map(|r| vec![("role", r.to_string())])
            .unwrap_or_default();

        self.cache
            .get_or_fetch(keys::parties(escrow_id).push_or_all(role), || {
                self.client.get_json(&path, &query)
            })
            .await
    }

    pub async fn create_party(&self, escrow_id: i64, party: &NewParty) -> ClientResult<Party> {
        let path = format!("/escrows/{escrow_id}/parties/");
        let created: Party = self.client.post_json(&path, party).await?;
        self.invalidate_parties(escrow_id);
        Ok(created)
    }

    pub async fn update_party(
        &self,
        escrow_id: i64,
        party_id: i64,
        update: &PartyUpdate,
    ) -> ClientResult<Party> {
        let path = format!("/escrows/{escrow_id}/parties/{party_id}/");
        let updated: Party = self.client.patch_json(&path, update).await?;
        self.invalidate_parties(escrow_id);
        Ok(updated)
    }

    pub async fn delete_party(&self, escrow_id: i64, party_id: i64) -> ClientResult<()> {
        let path = format!("/escrows/{escrow_id}/parties/{party_id}/");
        self.client.delete(&path).await?;
        self.invalidate_parties(escrow_id);
        Ok(())
    }

    fn invalidate_parties(&self, escrow_id: i64) {
        self.invalidate(&[keys::parties(escrow_id), keys::escrow(escrow_id)]);
    }
}

/// Flatten the payload into text form fields plus the agreement file.
fn multipart_fields(payload: &NewEscrow, file: &AgreementFile) -> ClientResult<Vec<FormField>> {
    let mut fields = Vec::new();

    if let Value::Object(map) = serde_json::to_value(payload)? {
        for (name, value) in map {
            match value {
                Value::Null => {}
                Value::String(text) => fields.push(FormField::text(name, text)),
                other => fields.push(FormField::text(name, other.to_string())),
            }
        }
    }

    fields.push(FormField::file(
        "agreement_upload",
        file.file_name.clone(),
        file.content_type.clone(),
        file.data.clone(),
    ));
    Ok(fields)
}
