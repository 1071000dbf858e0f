//! Recording transport for resource tests.

use crate::EscrowApi;
use async_trait::async_trait;
use escrow_auth::{
    ApiClient, ApiRequest, ApiResponse, ClientResult, RequestBody, SessionManager, Transport,
};
use escrow_storage::{MemoryStorage, TokenStore};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

type Handler = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

pub(crate) struct RecordingTransport {
    handler: Handler,
    requests: Mutex<Vec<ApiRequest>>,
}

impl RecordingTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.path == path).count()
    }

    pub fn last(&self) -> ApiRequest {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.requests.lock().push(request.clone());
        Ok((self.handler)(&request))
    }
}

/// API over `transport` with access token `t1` already in place.
pub(crate) fn api(transport: Arc<RecordingTransport>) -> EscrowApi {
    let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
    tokens.set_access_token(Some("t1".to_string()));
    EscrowApi::new(ApiClient::new(SessionManager::new(transport, tokens)))
}

pub(crate) fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

pub(crate) fn json_body(request: &ApiRequest) -> Value {
    match &request.body {
        RequestBody::Json(value) => value.clone(),
        other => panic!("expected JSON body, got {other:?}"),
    }
}
