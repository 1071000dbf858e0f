//! Wire types for the escrow REST API.
//!
//! Monetary amounts travel as decimal strings and are kept that way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Minimal user reference embedded in other resources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: i64,
    pub escrow: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewParty {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerRepresentation {
    pub id: i64,
    pub escrow: i64,
    pub invited_email: String,
    pub invited_as: String,
    pub status: String,
    pub invited_at: String,
    #[serde(default)]
    pub responded_at: Option<String>,
    #[serde(default)]
    pub invited_by: Option<UserRef>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerInvite {
    pub invited_email: String,
    pub invited_as: String,
}

/// Filters for listing broker representations.
#[derive(Debug, Clone, Default)]
pub struct BrokerFilters {
    pub invited_as: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionShare {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub broker_representation: i64,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionPool {
    pub id: i64,
    pub escrow: i64,
    pub total_amount: String,
    pub locked: bool,
    #[serde(default)]
    pub locked_at: Option<String>,
    #[serde(default)]
    pub shares: Vec<CommissionShare>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommissionPoolUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares: Option<Vec<CommissionShare>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Escrow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub participant_role: String,
    pub currency: String,
    pub transaction_type: String,
    pub property_type: String,
    pub property_value: String,
    #[serde(default)]
    pub closing_date: Option<String>,
    pub property_address: String,
    #[serde(default)]
    pub commission_percentage: Option<String>,
    #[serde(default)]
    pub commission_payer: Option<String>,
    #[serde(default)]
    pub due_diligence_days: Option<i64>,
    #[serde(default)]
    pub retention_amount: Option<String>,
    #[serde(default)]
    pub agreement_upload: Option<String>,
    pub status: String,
    pub created_by: UserRef,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub broker_representations: Vec<BrokerRepresentation>,
    #[serde(default)]
    pub commission_pool: Option<CommissionPool>,
}

/// Agreement document attached to a new escrow.
#[derive(Debug, Clone)]
pub struct AgreementFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Payload for creating an escrow. Unset optional fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewEscrow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub participant_role: String,
    pub currency: String,
    pub transaction_type: String,
    pub property_type: String,
    pub property_value: String,
    pub closing_date: String,
    pub property_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_percentage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_payer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_payment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_a_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_a_percentage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_b_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_b_percentage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_diligence_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_diligence_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_diligence_deadline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_diligence_fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_defects_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_party: Option<String>,
    #[serde(skip)]
    pub agreement_upload: Option<AgreementFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub escrow: i64,
    pub name: String,
    pub document_type: String,
    #[serde(default)]
    pub storage_key: String,
    #[serde(default)]
    pub storage_url: String,
    pub status: String,
    #[serde(default)]
    pub uploaded_by: Option<i64>,
    #[serde(default)]
    pub docu_sign_envelope_id: Option<String>,
    #[serde(default)]
    pub docu_sign_status: Option<String>,
    pub uploaded_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub document_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUpload {
    pub upload_url: String,
    pub storage_key: String,
}

/// A file to push through the presigned upload flow.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmlCheck {
    pub id: i64,
    pub record: i64,
    pub provider: String,
    pub status: String,
    #[serde(default)]
    pub requested_by: Option<i64>,
    pub requested_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub result_payload: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycRecord {
    pub id: i64,
    pub escrow: i64,
    pub subject_name: String,
    #[serde(default)]
    pub subject_email: Option<String>,
    pub status: String,
    #[serde(default)]
    pub checklist: Value,
    #[serde(default)]
    pub aml_checks: Vec<AmlCheck>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewKycRecord {
    pub subject_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_email: Option<String>,
    pub status: String,
    pub checklist: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}
