//! Scripted transport for tests.

use crate::{ApiRequest, ApiResponse, ClientError, ClientResult, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type Handler = Box<dyn Fn(&ApiRequest) -> Option<ApiResponse> + Send + Sync>;

/// Answers requests from a handler, records every request and can delay
/// responses per path.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    /// A `None` from the handler is delivered as a network failure.
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Option<ApiResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delays: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn calls(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    pub fn requests(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delays.get(&request.path) {
            tokio::time::sleep(*delay).await;
        }
        (self.handler)(&request).ok_or(ClientError::NetworkUnavailable)
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> Option<ApiResponse> {
    Some(ApiResponse::new(status, body.to_string()))
}

pub(crate) fn broker_user() -> Value {
    json!({"id": 1, "email": "a@b.com", "role": "BROKER", "first_name": "Ada"})
}

pub(crate) fn bearer(request: &ApiRequest) -> Option<&str> {
    request.bearer.as_deref()
}

pub(crate) fn shared(transport: ScriptedTransport) -> Arc<ScriptedTransport> {
    Arc::new(transport)
}

/// Default backend: login accepts password `x`, refresh issues `t2`,
/// logout answers 205, `/users/me/` returns the broker identity.
pub(crate) fn default_route(request: &ApiRequest) -> Option<ApiResponse> {
    match request.path.as_str() {
        "/auth/login/" => {
            let accepted = matches!(
                &request.body,
                crate::RequestBody::Json(body) if body["password"] == "x"
            );
            if accepted {
                json_response(
                    200,
                    json!({"access": "t1", "refresh": "r1", "user": broker_user()}),
                )
            } else {
                json_response(
                    401,
                    json!({"detail": "No active account found with the given credentials"}),
                )
            }
        }
        "/auth/refresh/" => json_response(200, json!({"access": "t2"})),
        "/auth/logout/" => Some(ApiResponse::new(205, "")),
        "/users/me/" => json_response(200, broker_user()),
        _ => json_response(404, json!({"detail": "Not found."})),
    }
}
