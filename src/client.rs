//! HTTP client for the chat backend.
//!
//! [`BackendClient`] adapts the backend's REST surface to the pipeline's
//! collaborator seams: it implements [`ChatTransport`] by opening the
//! streamed chat endpoint and [`HistoryStore`] by fetching a
//! conversation's persisted messages.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::controller::HistoryStore;
use crate::error::{Error, Result};
use crate::session::{ByteStream, ChatTransport};
use crate::types::{ChatRequest, ConversationId, Message};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies the bearer credential attached to every backend request.
///
/// Token acquisition (login, refresh) belongs to the auth collaborator;
/// the client only asks for the current credential on demand.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the current bearer token.
    async fn bearer_token(&self) -> Result<String>;
}

/// A token provider over a fixed credential string.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Create a provider for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Create a provider from an environment variable.
    pub fn from_env(var: &str) -> Result<Self> {
        std::env::var(var)
            .map(Self::new)
            .map_err(|_| Error::authentication(format!("{var} environment variable not set")))
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Client for the chat backend's REST API.
#[derive(Clone)]
pub struct BackendClient {
    http: ReqwestClient,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    request_timeout: Duration,
}

impl BackendClient {
    /// Create a new client for the backend at `base_url`.
    ///
    /// Only a connect timeout is set on the underlying client: the chat
    /// stream is long-lived, so a whole-request timeout would cut off
    /// slow generations. Non-streaming calls get a per-request timeout.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = ReqwestClient::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            http,
            base_url,
            tokens,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Sets the timeout applied to non-streaming requests.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(Error::from)
    }

    /// Create default headers, including the bearer credential.
    async fn default_headers(&self) -> Result<HeaderMap> {
        let token = self.tokens.bearer_token().await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::authentication("bearer token contains invalid characters"))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.request_timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
            detail: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|parsed| parsed.error.or(parsed.detail))
            .unwrap_or_else(|| error_body.clone());

        match status_code {
            401 => Error::authentication(message),
            404 => Error::not_found(message),
            429 => Error::rate_limit(message, retry_after),
            _ => Error::api(status_code, message, request_id),
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for BackendClient {
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let url = self.endpoint("chat/stream")?;

        let mut headers = self.default_headers().await?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let response = self
            .http
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        // A success status with an explicitly empty body cannot stream.
        if response.content_length() == Some(0) {
            return Err(Error::no_stream_body(
                "backend returned a success status without a response body",
            ));
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }
}

#[async_trait::async_trait]
impl HistoryStore for BackendClient {
    async fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let url = self.endpoint(&format!("sessions/{conversation_id}/messages"))?;
        let headers = self.default_headers().await?;

        let response = self
            .http
            .get(url)
            .headers(headers)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        #[derive(Deserialize)]
        struct MessagesResponse {
            messages: Vec<Message>,
        }

        let body = response.json::<MessagesResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse history response: {e}"),
                Some(Box::new(e)),
            )
        })?;
        Ok(body.messages)
    }
}
