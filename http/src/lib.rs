//! # restrecord http
//!
//! A `reqwest` transport for restrecord records, plus the environment
//! configuration the `restrecord` binary uses.
//!
//! ```rust,no_run
//! use restrecord_engine::{RecordType, SyncOptions};
//! use restrecord_http::{Config, ReqwestClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let client = ReqwestClient::new(&config)?.with_base_url("https://api.example.com");
//!
//! let users = RecordType::builder("User")
//!     .url_root("/users")
//!     .client(Arc::new(client))
//!     .build();
//! let all = users.fetch_all(SyncOptions::new()).await?;
//! println!("{} users", all.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;

pub use client::ReqwestClient;
pub use config::{Config, ConfigError};
