//! CLI command implementations.

mod auth;
mod brokers;
mod commission;
mod documents;
mod escrows;
mod health;
mod kyc;
mod parties;

pub use auth::{login, logout, status};
pub use brokers::{brokers_invite, brokers_list, brokers_respond};
pub use commission::{commission_lock, commission_show, commission_update};
pub use documents::{documents_envelope, documents_list, documents_upload};
pub use escrows::{escrows_create, escrows_list, escrows_show, EscrowDraft};
pub use health::health;
pub use kyc::{kyc_aml_check, kyc_create, kyc_list, kyc_run_aml};
pub use parties::{parties_add, parties_list, parties_remove, parties_update};

use crate::output::OutputFormat;
use anyhow::{bail, Context as _, Result};
use escrow_api::EscrowApi;
use escrow_auth::{ApiClient, GuardDecision, ReqwestTransport, RouteGuard, SessionManager};
use escrow_config::{Config, Paths};
use escrow_storage::{DurableStorage, FileStorage, MemoryStorage, TokenStore};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Roles allowed to record compliance checks.
pub const OFFICER_ROLES: [&str; 2] = ["ADMIN", "OFFICER"];

/// Everything a command needs to talk to the backend.
pub struct Context {
    pub session: SessionManager,
    pub api: EscrowApi,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(
        paths: &Paths,
        config: &Config,
        ephemeral: bool,
        format: OutputFormat,
    ) -> Result<Self> {
        let base_url = config.api_base_url()?;

        let storage: Box<dyn DurableStorage> = if ephemeral {
            Box::new(MemoryStorage::new())
        } else {
            paths.ensure_dirs()?;
            Box::new(FileStorage::new(paths.session_file()))
        };

        debug!(base_url = %base_url, ephemeral, "Building API client");
        let tokens = Arc::new(TokenStore::new(storage));
        let transport = Arc::new(ReqwestTransport::new(base_url));
        let session = SessionManager::new(transport, tokens);
        let api = EscrowApi::new(ApiClient::new(session.clone()));

        Ok(Self {
            session,
            api,
            format,
        })
    }

    /// Resolve the stored session and apply `guard` for `destination`.
    pub async fn require(&self, guard: &RouteGuard, destination: &str) -> Result<()> {
        self.session.resolve().await;

        match guard.check(&self.session.snapshot(), destination) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Loading => bail!("Session is still being restored, try again"),
            GuardDecision::RedirectToLogin { return_to, .. } => {
                debug!(return_to = %return_to, "Not logged in");
                bail!("Not logged in. Run `escrow login` first")
            }
            GuardDecision::AccessDenied { required } => {
                bail!("Access denied: requires role {}", required.join(" or "))
            }
        }
    }

    /// Any signed-in user.
    pub async fn require_login(&self, destination: &str) -> Result<()> {
        self.require(&RouteGuard::new(), destination).await
    }
}

/// Read a file for upload, guessing its content type from the extension.
pub fn read_upload(path: &Path) -> Result<(String, String, Vec<u8>)> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok((file_name, content_type_for(path).to_string(), data))
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
