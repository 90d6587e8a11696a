//! [`HttpClient`] implementation over `reqwest`.

use crate::config::Config;
use futures::future::BoxFuture;
use reqwest::Method;
use restrecord_engine::{HttpClient, HttpRequest, HttpResponse, TransportError, Verb};
use serde_json::Value;
use std::time::Duration;

/// Sends record requests with a shared `reqwest::Client`.
///
/// Relative URLs are joined onto the configured base URL. Bodies are sent
/// and decoded as JSON; an empty body decodes to `null`. Responses outside
/// the 2xx range become a [`TransportError`] carrying the status and the
/// decoded body.
///
/// The `timeout_secs` key of [`HttpRequest::extra`] overrides the default
/// timeout for one request; a negative or out-of-range value rejects the
/// request without sending it.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    /// Wrap an existing client.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The absolute URL a request for `url` is sent to.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(&request.url);
        let mut builder = self.http.request(method(request.verb), &url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(secs) = request.extra.get("timeout_secs").and_then(Value::as_f64) {
            let timeout = Duration::try_from_secs_f64(secs)
                .map_err(|_| TransportError::new(format!("invalid timeout_secs: {}", secs)))?;
            builder = builder.timeout(timeout);
        }
        if let Some(data) = &request.data {
            builder = builder.json(data);
        }

        tracing::debug!(verb = %request.verb, %url, "sending request");

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(verb = %request.verb, %url, error = %e, "request failed");
            TransportError::new(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        let data = decode(&body);

        if !status.is_success() {
            tracing::warn!(verb = %request.verb, %url, status = status.as_u16(), "error response");
            let data = (!data.is_null()).then_some(data);
            return Err(TransportError::with_status(status.as_u16(), data));
        }

        tracing::debug!(verb = %request.verb, %url, status = status.as_u16(), "response received");
        Ok(HttpResponse::new(status.as_u16(), data))
    }
}

impl HttpClient for ReqwestClient {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(self.execute(request))
    }
}

fn method(verb: Verb) -> Method {
    match verb {
        Verb::Get => Method::GET,
        Verb::Post => Method::POST,
        Verb::Put => Method::PUT,
        Verb::Patch => Method::PATCH,
        Verb::Delete => Method::DELETE,
    }
}

/// JSON if possible, otherwise the body as a string.
fn decode(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
