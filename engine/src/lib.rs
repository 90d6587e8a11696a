//! # restrecord engine
//!
//! Declarative records backed by REST resources.
//!
//! This crate binds in-memory records to a remote HTTP collection. It
//! handles construction with defaults, field filters, change tracking,
//! validation, and the create/read/update/delete round trips, leaving the
//! actual HTTP to whatever [`HttpClient`] the application plugs in.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine builds requests and consumes responses; the
//!   transport lives behind [`HttpClient`]
//! - **One engine, many types**: a [`RecordType`] is configuration, not a
//!   Rust type; [`RecordType::extend`] derives new types that inherit and
//!   override it
//! - **Server state is the baseline**: change tracking compares against the
//!   last fetched or saved state, never against pending edits
//!
//! ## Core Concepts
//!
//! ### Record types
//!
//! A [`RecordType`] declares the URL root, id attribute, defaults, parse
//! hook, read/write [`FilterMap`]s, [`Validations`] and transport of its
//! records. Child types fall back to their parent for anything they do not
//! declare, and overriding hooks can reach the parent through [`Super`].
//!
//! ### Records
//!
//! A [`Record`] holds an ordered JSON object of fields plus a
//! [`ChangeSnapshot`]. Its lifecycle:
//! - [`Record::fetch`] - reload from the backend
//! - [`Record::save`] - validate, then create (no id) or update (with id)
//! - [`Record::destroy`] - delete on the backend; a no-op for new records
//!
//! ### Collections
//!
//! [`RecordType::fetch_all`] loads a whole collection and
//! [`RecordType::fetch_one`] a single record by id.
//!
//! ## Quick Start
//!
//! ```rust
//! use restrecord_engine::testing::MockBackend;
//! use restrecord_engine::{RecordType, Rule, SyncOptions, Validations, Verb};
//! use serde_json::json;
//!
//! // 1. Point a record type at a backend
//! let backend = MockBackend::new();
//! let users = RecordType::builder("User")
//!     .url_root("/users")
//!     .validations(Validations::new().field("name", [Rule::required()]))
//!     .client(backend.clone())
//!     .build();
//!
//! // 2. Build a record and change it
//! let mut user = users.new_record();
//! user.set("name", "Alice");
//! assert_eq!(user.changed_attributes().len(), 1);
//!
//! // 3. Save it; the server assigns an id
//! backend
//!     .expect(Verb::Post, "/users")
//!     .respond(json!({"id": 1, "name": "Alice"}));
//! futures::executor::block_on(user.save(None, SyncOptions::new())).unwrap();
//!
//! assert_eq!(user.url().unwrap(), "/users/1");
//! assert!(!user.has_changed());
//! ```

pub mod collection;
pub mod error;
pub mod filter;
pub mod operation;
pub mod provider;
pub mod record;
pub mod record_type;
pub mod snapshot;
#[cfg(any(test, feature = "test_utils"))]
pub mod testing;
pub mod transport;
pub mod validation;

// Re-export main types at crate root
pub use error::Error;
pub use filter::{apply_filters, Filter, FilterFn, FilterMap, FilterRegistry, TransformFn};
pub use operation::{Operation, SyncOptions, Verb};
pub use provider::Provider;
pub use record::{InitOptions, Record};
pub use record_type::{
    InitializeFn, MethodFn, ParseFn, RecordType, RecordTypeBuilder, Super, UrlFn,
    DEFAULT_ID_ATTRIBUTE,
};
pub use snapshot::ChangeSnapshot;
pub use transport::{HttpClient, HttpRequest, HttpResponse, TransportError};
pub use validation::{
    Messages, Rule, ValidationErrors, Validations, ValidatorFn, INVALID_MESSAGE, REQUIRED_MESSAGE,
};

/// Record fields: an ordered JSON object.
pub type Fields = serde_json::Map<String, serde_json::Value>;
