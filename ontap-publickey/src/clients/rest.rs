//! REST transport for the ONTAP management API.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::ConnectionConfig;

/// Query string parameters, in the order they are sent.
pub type Query = Vec<(String, String)>;

/// HTTP methods used against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Patch => write!(f, "PATCH"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Outcome of a single request.
///
/// `status` is `None` when no HTTP response was received at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestResponse {
    pub status: Option<u16>,
    pub body: Option<Value>,
    pub error: Option<String>,
}

impl RestResponse {
    pub fn ok(status: u16, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            body,
            error: None,
        }
    }

    pub fn failed(status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && matches!(self.status, Some(s) if (200..300).contains(&s))
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Decoded body on success, otherwise the error text.
    pub fn into_result(self) -> Result<Option<Value>, String> {
        if self.is_success() {
            return Ok(self.body);
        }
        Err(match (self.error, self.status) {
            (Some(error), _) => error,
            (None, Some(status)) => format!("status {}", status),
            (None, None) => "no response".to_string(),
        })
    }
}

/// Sends one request to the API and reports what came back.
///
/// Implementations never retry; a failed request is reported through
/// `RestResponse::error`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(
        &self,
        method: Method,
        api: &str,
        query: &Query,
        body: Option<&Value>,
    ) -> RestResponse;
}

/// Transport backed by reqwest with basic authentication.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl RestClient {
    pub fn new(config: &ConnectionConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.validate_certs)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

/// Pull the message out of an ONTAP error body (`{"error": {"message": ..}}`).
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match error.get("message").and_then(Value::as_str) {
        Some(message) => Some(message.to_string()),
        None => Some(error.to_string()),
    }
}

#[async_trait]
impl Transport for RestClient {
    async fn send_request(
        &self,
        method: Method,
        api: &str,
        query: &Query,
        body: Option<&Value>,
    ) -> RestResponse {
        let url = format!("{}{}", self.base_url, api);
        debug!("{} {} query={:?}", method, url, query);

        let mut request = self
            .http
            .request(method.into(), &url)
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return RestResponse::failed(None, e.to_string()),
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return RestResponse::failed(Some(status.as_u16()), e.to_string()),
        };
        let decoded: Option<Value> = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        debug!("{} {} -> {}", method, url, status);

        if status.is_success() {
            return RestResponse::ok(status.as_u16(), decoded);
        }

        let error = decoded
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| format!("status {}", status.as_u16()));
        RestResponse {
            status: Some(status.as_u16()),
            body: decoded,
            error: Some(error),
        }
    }
}
