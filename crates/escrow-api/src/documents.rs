//! Escrow documents and the presigned upload flow.

use crate::models::{Document, NewDocument, PresignedUpload, UploadFile};
use crate::{keys, EscrowApi};
use escrow_auth::{ApiRequest, ClientResult};
use serde_json::json;
use tracing::{debug, info};

impl EscrowApi {
    pub async fn list_documents(&self, escrow_id: i64) -> ClientResult<Vec<Document>> {
        let path = documents_path(escrow_id);
        self.cache
            .get_or_fetch(keys::documents(escrow_id), || {
                self.client.get_json(&path, &[])
            })
            .await
    }

    pub async fn create_document(
        &self,
        escrow_id: i64,
        document: &NewDocument,
    ) -> ClientResult<Document> {
        let created: Document = self
            .client
            .post_json(&documents_path(escrow_id), document)
            .await?;
        self.invalidate(&[keys::documents(escrow_id)]);
        Ok(created)
    }

    /// Ask the server for a presigned URL to upload `file_name` to.
    pub async fn request_presign(
        &self,
        escrow_id: i64,
        file_name: &str,
        content_type: Option<&str>,
    ) -> ClientResult<PresignedUpload> {
        let path = format!("{}presign/", documents_path(escrow_id));
        self.client
            .post_json(
                &path,
                &json!({ "file_name": file_name, "content_type": content_type }),
            )
            .await
    }

    /// Record where an uploaded document now lives.
    pub async fn mark_uploaded(
        &self,
        escrow_id: i64,
        document_id: i64,
        storage_key: &str,
        storage_url: &str,
    ) -> ClientResult<Document> {
        let path = format!("{}{document_id}/mark-uploaded/", documents_path(escrow_id));
        let document: Document = self
            .client
            .post_json(
                &path,
                &json!({ "storage_key": storage_key, "storage_url": storage_url }),
            )
            .await?;
        self.invalidate(&[keys::documents(escrow_id)]);
        Ok(document)
    }

    /// Start the signing envelope for a document.
    pub async fn trigger_envelope(
        &self,
        escrow_id: i64,
        document_id: i64,
    ) -> ClientResult<Document> {
        let path = format!(
            "{}{document_id}/trigger-envelope/",
            documents_path(escrow_id)
        );
        let document: Document = self.client.send(ApiRequest::post(path)).await?.json()?;
        self.invalidate(&[keys::documents(escrow_id)]);
        info!(escrow_id, document_id, "Signing envelope triggered");
        Ok(document)
    }

    /// Upload file contents for an existing document.
    ///
    /// Requests a presigned URL, PUTs the bytes there directly, then marks the
    /// document uploaded. The presigned URL carries no session credentials.
    pub async fn upload_file(
        &self,
        escrow_id: i64,
        document_id: i64,
        file: UploadFile,
    ) -> ClientResult<Document> {
        let presign = self
            .request_presign(escrow_id, &file.file_name, Some(file.content_type.as_str()))
            .await?;
        debug!(
            escrow_id,
            document_id,
            storage_key = %presign.storage_key,
            "Uploading to presigned URL"
        );

        self.client
            .put_bytes(&presign.upload_url, &file.content_type, file.data)
            .await?;

        self.mark_uploaded(
            escrow_id,
            document_id,
            &presign.storage_key,
            storage_url(&presign.upload_url),
        )
        .await
    }

    /// Create a document record and upload its contents.
    pub async fn upload_document(
        &self,
        escrow_id: i64,
        document: &NewDocument,
        file: UploadFile,
    ) -> ClientResult<Document> {
        let created = self.create_document(escrow_id, document).await?;
        let uploaded = self.upload_file(escrow_id, created.id, file).await?;
        info!(escrow_id, document_id = uploaded.id, "Document uploaded");
        Ok(uploaded)
    }
}

fn documents_path(escrow_id: i64) -> String {
    format!("/escrows/{escrow_id}/documents/")
}

/// Presigned URL without its signature query.
fn storage_url(upload_url: &str) -> &str {
    upload_url
        .split_once('?')
        .map_or(upload_url, |(base, _)| base)
}
