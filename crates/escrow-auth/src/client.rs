//! Authenticated API client.
//!
//! Attaches the current access token to every API request. A 401 triggers the
//! session's single-flight refresh and the request is re-sent exactly once
//! with the new token.

use crate::{
    ApiRequest, ApiResponse, ClientResult, FormField, Method, RequestBody, SessionManager,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// HTTP client wrapper bound to a session.
#[derive(Clone, Debug)]
pub struct ApiClient {
    session: SessionManager,
}

impl ApiClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a request, recovering once from an expired access token.
    ///
    /// Returns the response for any 2xx status; every other status is turned
    /// into a [`crate::ClientError`]. A second 401 after the retry, or a failed
    /// refresh, yields [`crate::ClientError::Unauthorized`] built from that 401.
    pub async fn send(&self, mut request: ApiRequest) -> ClientResult<ApiResponse> {
        let api_path = request.is_api_path();
        if api_path {
            request.bearer = self.session.tokens().access_token();
        }

        let response = self.session.transport().send(request.clone()).await?;

        if response.status != 401 || request.retried || !api_path {
            return response.error_for_status();
        }

        request.retried = true;
        debug!(path = %request.path, "Access token rejected, refreshing session");

        let Some(token) = self.session.refresh_session().await else {
            debug!(path = %request.path, "Session could not be refreshed");
            return response.error_for_status();
        };

        request.bearer = Some(token);
        self.session
            .transport()
            .send(request)
            .await?
            .error_for_status()
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let mut request = ApiRequest::get(path);
        for (key, value) in query {
            request = request.with_query(*key, value.clone());
        }
        self.send(request).await?.json()
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send_json(Method::Post, path, body).await
    }

    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send_json(Method::Patch, path, body).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(ApiRequest::new(Method::Delete, path)).await?;
        Ok(())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<FormField>,
    ) -> ClientResult<T> {
        let mut request = ApiRequest::post(path);
        request.body = RequestBody::Multipart(fields);
        self.send(request).await?.json()
    }

    /// PUT raw bytes, typically to a presigned upload URL.
    pub async fn put_bytes(&self, url: &str, content_type: &str, data: Vec<u8>) -> ClientResult<()> {
        let mut request = ApiRequest::new(Method::Put, url);
        request.body = RequestBody::Bytes {
            content_type: content_type.to_string(),
            data,
        };
        self.send(request).await?;
        Ok(())
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = ApiRequest::new(method, path);
        request.body = RequestBody::Json(serde_json::to_value(body)?);
        self.send(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::REFRESH_PATH;
    use crate::ClientError;
    use crate::testing::{bearer, default_route, json_response, shared, ScriptedTransport};
    use escrow_storage::{MemoryStorage, TokenStore};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    async fn logged_in_client(transport: Arc<ScriptedTransport>) -> (ApiClient, Arc<TokenStore>) {
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        let session = SessionManager::new(transport, Arc::clone(&tokens));
        session.login("a@b.com", "x").await.unwrap();
        (ApiClient::new(session), tokens)
    }

    /// `/escrows/` only accepts the refreshed token `t2`.
    fn escrows_require_t2(request: &ApiRequest) -> Option<crate::ApiResponse> {
        match request.path.as_str() {
            "/escrows/" if bearer(request) == Some("t2") => {
                json_response(200, json!({"count": 0, "next": null, "previous": null, "results": []}))
            }
            "/escrows/" => json_response(401, json!({"detail": "Given token not valid"})),
            _ => default_route(request),
        }
    }

    #[tokio::test]
    async fn test_bearer_is_attached() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            "/health/" => json_response(200, json!({"status": "ok"})),
            _ => default_route(req),
        }));
        let (client, _) = logged_in_client(Arc::clone(&transport)).await;

        let health: Value = client.get_json("/health/", &[]).await.unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(transport.requests("/health/")[0].bearer.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_anonymous_requests_carry_no_bearer() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            "/health/" => json_response(200, json!({"status": "ok"})),
            _ => default_route(req),
        }));
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        let client = ApiClient::new(SessionManager::new(transport.clone(), tokens));

        let _: Value = client.get_json("/health/", &[]).await.unwrap();
        assert_eq!(transport.requests("/health/")[0].bearer, None);
    }

    #[tokio::test]
    async fn test_401_refreshes_and_retries_with_new_token() {
        let transport = shared(ScriptedTransport::new(escrows_require_t2));
        let (client, tokens) = logged_in_client(Arc::clone(&transport)).await;

        let page: Value = client.get_json("/escrows/", &[]).await.unwrap();
        assert_eq!(page["count"], 0);

        let sent = transport.requests("/escrows/");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bearer.as_deref(), Some("t1"));
        assert!(!sent[0].retried);
        assert_eq!(sent[1].bearer.as_deref(), Some("t2"));
        assert!(sent[1].retried);
        assert_eq!(transport.calls(REFRESH_PATH), 1);
        assert_eq!(tokens.access_token().as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let transport = shared(
            ScriptedTransport::new(escrows_require_t2)
                .with_delay(REFRESH_PATH, Duration::from_millis(20)),
        );
        let (client, _) = logged_in_client(Arc::clone(&transport)).await;

        let results = futures::future::join_all(
            (0..4).map(|_| client.get_json::<Value>("/escrows/", &[])),
        )
        .await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(transport.calls(REFRESH_PATH), 1);

        let sent = transport.requests("/escrows/");
        assert_eq!(sent.len(), 8);
        assert_eq!(
            sent.iter().filter(|r| r.bearer.as_deref() == Some("t2")).count(),
            4
        );
    }

    #[tokio::test]
    async fn test_second_401_is_final() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            "/escrows/" => json_response(401, json!({"detail": "nope"})),
            _ => default_route(req),
        }));
        let (client, _) = logged_in_client(Arc::clone(&transport)).await;

        let err = client.get_json::<Value>("/escrows/", &[]).await.unwrap_err();
        assert!(err.requires_reauthentication());
        assert_eq!(transport.calls(REFRESH_PATH), 1);
        assert_eq!(transport.calls("/escrows/"), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_purges_and_propagates_401() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            "/escrows/" => json_response(401, json!({"detail": "expired"})),
            REFRESH_PATH => json_response(401, json!({"detail": "Token is blacklisted"})),
            _ => default_route(req),
        }));
        let (client, tokens) = logged_in_client(Arc::clone(&transport)).await;

        let err = client.get_json::<Value>("/escrows/", &[]).await.unwrap_err();
        match err {
            ClientError::Unauthorized(detail) => assert_eq!(detail.as_deref(), Some("expired")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls("/escrows/"), 1);
        assert_eq!(tokens.access_token(), None);
        assert_eq!(tokens.refresh_token(), None);
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_non_401_errors_propagate_unchanged() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            "/escrows/" => json_response(400, json!({"title": ["This field is required."]})),
            _ => default_route(req),
        }));
        let (client, _) = logged_in_client(Arc::clone(&transport)).await;

        let err = client
            .post_json::<_, Value>("/escrows/", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.field_errors().unwrap()["title"],
            vec!["This field is required."]
        );
        assert_eq!(transport.calls(REFRESH_PATH), 0);

        let missing = client.get_json::<Value>("/escrows/9/", &[]).await.unwrap_err();
        assert!(matches!(missing, ClientError::NotFound));
    }

    #[tokio::test]
    async fn test_absolute_urls_skip_bearer_and_refresh() {
        let upload = "https://bucket.example.com/doc.pdf?sig=abc";
        let transport = shared(ScriptedTransport::new(move |req| {
            if req.path == upload {
                json_response(401, json!({}))
            } else {
                default_route(req)
            }
        }));
        let (client, _) = logged_in_client(Arc::clone(&transport)).await;

        let err = client
            .put_bytes(upload, "application/pdf", b"%PDF".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(None)));

        let sent = transport.requests(upload);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bearer, None);
        assert_eq!(transport.calls(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_query_parameters_are_forwarded() {
        let transport = shared(ScriptedTransport::new(|req| match req.path.as_str() {
            "/escrows/" => json_response(200, json!({"count": 0, "results": []})),
            _ => default_route(req),
        }));
        let (client, _) = logged_in_client(Arc::clone(&transport)).await;

        let _: Value = client
            .get_json("/escrows/", &[("status", "OPEN".to_string())])
            .await
            .unwrap();
        assert_eq!(
            transport.requests("/escrows/")[0].query,
            vec![("status".to_string(), "OPEN".to_string())]
        );
    }
}
