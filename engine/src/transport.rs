//! The boundary to whatever actually performs HTTP requests.
//!
//! The engine never does IO itself. A record type is given an
//! [`HttpClient`]; the engine builds an [`HttpRequest`] for each operation
//! and consumes the [`HttpResponse`] or [`TransportError`] it produces.

use crate::{Fields, Verb};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A request as handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub verb: Verb,
    pub url: String,
    /// JSON body, present for create and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Options the engine does not interpret
    #[serde(default)]
    pub extra: Fields,
}

impl HttpRequest {
    pub fn new(verb: Verb, url: impl Into<String>) -> Self {
        Self {
            verb,
            url: url.into(),
            data: None,
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            extra: Fields::new(),
        }
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    /// Decoded JSON body, `null` when the body was empty
    pub data: Value,
}

impl HttpResponse {
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    /// A `200 OK` carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self::new(200, data)
    }
}

/// Why the transport rejected a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportError {
    /// HTTP status, if a response was received at all
    pub status: Option<u16>,
    pub message: String,
    /// Decoded error body, if any
    pub data: Option<Value>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            data: None,
        }
    }

    /// An error response from the server.
    pub fn with_status(status: u16, data: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: format!("request failed with status {}", status),
            data,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Something that can perform a request.
pub trait HttpClient: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}
