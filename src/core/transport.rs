//! HTTP Transport
//!
//! HTTP client interface and implementations for token endpoint requests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{NetworkError, ProtocolError, SessionError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum accepted response body (1 MiB).
pub const MAX_RESPONSE_SIZE: usize = 1_048_576;

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Build a form-encoded POST that asks for a JSON response.
    pub fn form_post(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().copied())
            .finish();

        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body: Some(body),
            timeout: None,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Decode the form body back into pairs.
    pub fn form_fields(&self) -> HashMap<String, String> {
        self.body
            .as_deref()
            .map(|body| {
                url::form_urlencoded::parse(body.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// HTTP response definition.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    /// Response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body: body.to_string(),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SessionError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create new transport with default settings.
    pub fn new() -> Result<Self, SessionError> {
        Self::with_options(DEFAULT_TIMEOUT, MAX_RESPONSE_SIZE)
    }

    /// Create transport with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NetworkError::TlsError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let response = req_builder
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| network_error(e, timeout))?;

        let status = response.status().as_u16();
        let success = (200..300).contains(&status);

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        if success {
            if let Some(len) = response.content_length() {
                if len as usize > self.max_response_size {
                    return Err(ProtocolError::ResponseTooLarge { size: len as usize }.into());
                }
            }
        }

        // Error bodies are only read for a description, so they are cut at the limit
        let body = read_body(response, self.max_response_size, success, timeout).await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn network_error(e: reqwest::Error, timeout: Duration) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout { timeout }
    } else {
        NetworkError::ConnectionFailed {
            message: e.to_string(),
        }
    }
}

/// Read at most `limit` bytes. Past the limit a 2xx body is an error and any
/// other body is truncated.
async fn read_body(
    mut response: reqwest::Response,
    limit: usize,
    success: bool,
    timeout: Duration,
) -> Result<String, SessionError> {
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| network_error(e, timeout))?
    {
        if bytes.len() + chunk.len() > limit {
            if success {
                return Err(ProtocolError::ResponseTooLarge {
                    size: bytes.len() + chunk.len(),
                }
                .into());
            }
            bytes.extend_from_slice(&chunk[..limit - bytes.len()]);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Scripted reply for [`MockHttpTransport`].
#[derive(Clone, Debug)]
pub enum MockReply {
    Response(HttpResponse),
    ConnectionFailure(String),
}

/// Mock HTTP transport for testing. Replies are served in the order queued.
#[derive(Default)]
pub struct MockHttpTransport {
    replies: Mutex<VecDeque<MockReply>>,
    request_history: Mutex<Vec<HttpRequest>>,
    default_response: Mutex<Option<HttpResponse>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        self.lock_replies().push_back(MockReply::Response(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response(&self, status: u16, body: serde_json::Value) -> &Self {
        self.queue_response(HttpResponse::json(status, &body))
    }

    /// Queue a transport-level failure.
    pub fn queue_connection_failure(&self, message: impl Into<String>) -> &Self {
        self.lock_replies()
            .push_back(MockReply::ConnectionFailure(message.into()));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *self
            .default_response
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(response);
        self
    }

    /// Get request history.
    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.lock_history().clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.lock_history().len()
    }

    /// Get last request.
    pub fn get_last_request(&self) -> Option<HttpRequest> {
        self.lock_history().last().cloned()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, Vec<HttpRequest>> {
        self.request_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SessionError> {
        self.lock_history().push(request);

        let reply = self.lock_replies().pop_front().or_else(|| {
            self.default_response
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .map(MockReply::Response)
        });

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::ConnectionFailure(message)) => {
                Err(NetworkError::ConnectionFailed { message }.into())
            }
            None => Err(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
            }
            .into()),
        }
    }
}
