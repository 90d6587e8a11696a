//! CRUD operations and the options that shape the request for them.
//!
//! Every lifecycle method on a record boils down to one [`Operation`] sent
//! through the record type's transport. The operation picks the HTTP
//! [`Verb`] unless [`SyncOptions`] say otherwise.

use crate::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP verb used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four things a record can ask of its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// The verb this operation maps to by default.
    pub fn verb(&self) -> Verb {
        match self {
            Operation::Create => Verb::Post,
            Operation::Read => Verb::Get,
            Operation::Update => Verb::Put,
            Operation::Delete => Verb::Delete,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Read => write!(f, "read"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Per-call options for fetch, save, destroy and the collection loaders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOptions {
    /// Verb to use instead of the operation's default
    pub verb: Option<Verb>,
    /// URL to use instead of the record's URL
    pub url: Option<String>,
    /// Extra request headers
    pub headers: BTreeMap<String, String>,
    /// Query string parameters
    pub params: BTreeMap<String, String>,
    /// Anything else, handed to the transport untouched
    pub extra: Fields,
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verb(mut self, verb: Verb) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}
