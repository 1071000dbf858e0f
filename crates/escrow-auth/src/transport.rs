//! HTTP transport seam.
//!
//! [`Transport`] is the single point where requests leave the process. The
//! session manager and API client only ever talk to it, so tests can swap in a
//! scripted implementation.

use crate::{ClientError, ClientResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// A multipart form value.
#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        data: Vec<u8>,
    },
}

/// A named multipart form field.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                data,
            },
        }
    }
}

/// Request body.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
}

/// Outgoing request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// API path relative to the base URL, or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
    /// Set once the request has been re-sent after a 401.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Whether the path targets the API (as opposed to an absolute URL).
    pub fn is_api_path(&self) -> bool {
        !is_absolute_url(&self.path)
    }
}

/// Response status and raw body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Turn a non-success response into its [`ClientError`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_response(self.status, &self.body))
        }
    }
}

/// Sends requests to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

fn is_absolute_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: with_trailing_slash(base_url),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path. Relative paths join under the base URL,
    /// absolute URLs pass through unchanged.
    pub fn resolve(&self, path: &str) -> ClientResult<Url> {
        if is_absolute_url(path) {
            return Ok(Url::parse(path)?);
        }
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let url = self.resolve(&request.path)?;

        debug!(
            method = request.method.as_str(),
            url = %url,
            retried = request.retried,
            "Sending request"
        );

        let mut builder = match request.method {
            Method::Get => self.http_client.get(url),
            Method::Post => self.http_client.post(url),
            Method::Put => self.http_client.put(url),
            Method::Patch => self.http_client.patch(url),
            Method::Delete => self.http_client.delete(url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
            RequestBody::Bytes { content_type, data } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, "Received response");

        Ok(ApiResponse { status, body })
    }
}

fn build_form(fields: Vec<FormField>) -> ClientResult<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for field in fields {
        form = match field.value {
            FormValue::Text(value) => form.text(field.name, value),
            FormValue::File {
                file_name,
                content_type,
                data,
            } => {
                let part = reqwest::multipart::Part::bytes(data)
                    .file_name(file_name)
                    .mime_str(&content_type)?;
                form.part(field.name, part)
            }
        };
    }
    Ok(form)
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_relative_paths_join_under_base() {
        let t = transport("http://localhost:8000/");
        assert_eq!(
            t.resolve("/auth/login/").unwrap().as_str(),
            "http://localhost:8000/auth/login/"
        );
        assert_eq!(
            t.resolve("escrows/7/").unwrap().as_str(),
            "http://localhost:8000/escrows/7/"
        );
    }

    #[test]
    fn test_base_path_is_preserved() {
        let t = transport("https://api.example.com/v1");
        assert_eq!(t.base_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            t.resolve("/escrows/").unwrap().as_str(),
            "https://api.example.com/v1/escrows/"
        );
    }

    #[test]
    fn test_absolute_urls_pass_through() {
        let t = transport("http://localhost:8000/");
        let presigned = "https://bucket.s3.amazonaws.com/doc.pdf?X-Amz-Signature=abc";
        assert_eq!(t.resolve(presigned).unwrap().as_str(), presigned);
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("/escrows/")
            .with_query("status", "OPEN")
            .with_bearer("t1");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query, vec![("status".into(), "OPEN".into())]);
        assert_eq!(request.bearer.as_deref(), Some("t1"));
        assert!(!request.retried);
        assert!(request.is_api_path());
        assert!(!ApiRequest::get("https://s3/x").is_api_path());
    }

    #[test]
    fn test_response_json_and_status() {
        let ok = ApiResponse::new(200, r#"{"status": "ok"}"#);
        let value: Value = ok.json().unwrap();
        assert_eq!(value["status"], "ok");

        let empty = ApiResponse::new(205, "");
        assert!(empty.json::<()>().is_ok());
        assert_eq!(empty.json::<Value>().unwrap(), Value::Null);

        let err = ApiResponse::new(404, "").error_for_status().unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
    }
}
