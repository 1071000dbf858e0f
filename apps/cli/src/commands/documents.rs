//! Document commands.

use super::{read_upload, Context};
use crate::output::{self, or_dash, OutputFormat};
use anyhow::Result;
use escrow_api::{NewDocument, UploadFile};
use std::path::Path;
use tracing::info;

/// List documents on an escrow.
pub async fn documents_list(ctx: &Context, escrow_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/documents")).await?;
    let documents = ctx.api.list_documents(escrow_id).await?;

    match ctx.format {
        OutputFormat::Text => {
            if documents.is_empty() {
                println!("No documents found");
                return Ok(());
            }
            println!(
                "{:<8} {:<28} {:<14} {:<10} {}",
                "ID", "Name", "Type", "Status", "Signature"
            );
            println!("{}", "-".repeat(80));
            for document in &documents {
                println!(
                    "{:<8} {:<28} {:<14} {:<10} {}",
                    document.id,
                    document.name,
                    document.document_type,
                    document.status,
                    or_dash(document.docu_sign_status.as_deref())
                );
            }
        }
        OutputFormat::Json => output::print_json(&documents)?,
    }

    Ok(())
}

/// Create a document and upload its file.
///
/// With `document_id`, uploads into an existing document instead.
pub async fn documents_upload(
    ctx: &Context,
    escrow_id: i64,
    path: &Path,
    name: Option<String>,
    document_type: &str,
    document_id: Option<i64>,
) -> Result<()> {
    let (file_name, content_type, data) = read_upload(path)?;

    ctx.require_login(&format!("/escrows/{escrow_id}/documents")).await?;

    info!(escrow_id, file = %file_name, bytes = data.len(), "Uploading document");
    let file = UploadFile {
        file_name: file_name.clone(),
        content_type,
        data,
    };

    let document = match document_id {
        Some(document_id) => ctx.api.upload_file(escrow_id, document_id, file).await?,
        None => {
            let new_document = NewDocument {
                name: name.unwrap_or(file_name),
                document_type: document_type.to_string(),
            };
            ctx.api.upload_document(escrow_id, &new_document, file).await?
        }
    };

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("Uploaded {} as document {}", document.name, document.id),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&document)?,
    }

    Ok(())
}

/// Send a document out for signature.
pub async fn documents_envelope(ctx: &Context, escrow_id: i64, document_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/documents")).await?;
    let document = ctx.api.trigger_envelope(escrow_id, document_id).await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!(
                "Signature requested for document {} ({})",
                document.id,
                or_dash(document.docu_sign_status.as_deref())
            ),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&document)?,
    }

    Ok(())
}
