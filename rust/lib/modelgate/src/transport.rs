//! HTTP collaborator behind every gateway call.
//!
//! The core never talks to `reqwest` directly; it goes through [`Transport`]
//! so a session can be driven by any client (or a scripted one in tests).
//! Authentication follows the Go-style `oauth2.TokenSource` pattern.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;

// ── TokenSource ─────────────────────────────────────────────────────

/// Pluggable token provider. Called before every request.
///
/// Returns `Ok(None)` to skip the Authorization header (anonymous).
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn token(&self) -> Result<Option<String>, TransportError>;
}

/// No authentication: anonymous requests.
pub struct NoAuth;

#[async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Result<Option<String>, TransportError> {
        Ok(None)
    }
}

/// Static bearer token (already obtained externally).
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>, TransportError> {
        Ok(Some(self.0.clone()))
    }
}

// ── Transport ───────────────────────────────────────────────────────

/// Raw text body plus its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub content_type: Option<String>,
    pub body: String,
}

/// Server-relative request issuer. Paths always start with `/`.
///
/// Implementations must not retry; retry policy belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// GET `path` and decode the body as JSON.
    async fn get_json(&self, path: &str) -> Result<Value, TransportError>;

    /// POST `body` as JSON to `path` and decode the JSON answer.
    /// An empty answer decodes to `Value::Null`.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, TransportError>;

    /// GET `path` as text, keeping the content type for format negotiation.
    async fn get_text(&self, path: &str) -> Result<TextResponse, TransportError>;
}

/// [`Transport`] over `reqwest`.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    token_source: Arc<dyn TokenSource>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, token_source: Arc<dyn TokenSource>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token_source)
    }

    /// Use a preconfigured client (timeouts, proxies, ...).
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token_source: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token_source,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build a request with auth header.
    async fn authed(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        match self.token_source.token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    /// Map non-2xx answers to `TransportError::Server`.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Server { status: code, message: body });
        }
        Ok(resp)
    }

    fn decode(body: &str) -> Result<Value, TransportError> {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(body)
            .map_err(|e| TransportError::Decode(format!("response body: {}", e)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        debug!("GET {}", path);
        let req = self.authed(self.http.get(self.url(path))).await?;
        let resp = Self::check(req.send().await?).await?;
        let body = resp.text().await?;
        Self::decode(&body)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
        debug!("POST {}", path);
        let req = self.authed(self.http.post(self.url(path)).json(body)).await?;
        let resp = Self::check(req.send().await?).await?;
        let text = resp.text().await?;
        Self::decode(&text)
    }

    async fn get_text(&self, path: &str) -> Result<TextResponse, TransportError> {
        debug!("GET {} (text)", path);
        let req = self.authed(self.http.get(self.url(path))).await?;
        let resp = Self::check(req.send().await?).await?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        Ok(TextResponse { content_type, body })
    }
}

// ── Scripted transport for unit tests ───────────────────────────────

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// One request as seen by the transport.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Get(String),
        Post(String, Value),
        GetText(String),
    }

    /// Replays queued answers in order and records every request.
    #[derive(Default)]
    pub struct MockTransport {
        answers: Mutex<VecDeque<Result<Value, TransportError>>>,
        texts: Mutex<VecDeque<Result<TextResponse, TransportError>>>,
        pub requests: Mutex<Vec<Recorded>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn answer(&self, value: Value) -> &Self {
            self.answers.lock().unwrap().push_back(Ok(value));
            self
        }

        pub fn fail(&self, status: u16) -> &Self {
            self.answers.lock().unwrap().push_back(Err(TransportError::Server {
                status,
                message: "scripted failure".into(),
            }));
            self
        }

        pub fn text(&self, content_type: Option<&str>, body: &str) -> &Self {
            self.texts.lock().unwrap().push_back(Ok(TextResponse {
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            }));
            self
        }

        pub fn fail_text(&self, status: u16) -> &Self {
            self.texts.lock().unwrap().push_back(Err(TransportError::Server {
                status,
                message: "scripted failure".into(),
            }));
            self
        }

        pub fn recorded(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }

        fn next(&self) -> Result<Value, TransportError> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Decode("no scripted answer".into())))
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
            self.requests.lock().unwrap().push(Recorded::Get(path.to_string()));
            self.next()
        }

        async fn post_json(&self, path: &str, body: &Value) -> Result<Value, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push(Recorded::Post(path.to_string(), body.clone()));
            self.next()
        }

        async fn get_text(&self, path: &str) -> Result<TextResponse, TransportError> {
            self.requests.lock().unwrap().push(Recorded::GetText(path.to_string()));
            self.texts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Decode("no scripted text".into())))
        }
    }
}
