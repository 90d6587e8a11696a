//! restrecord - list a REST collection as pretty-printed JSON.
//!
//! Reads `RESTRECORD_BASE_URL` and `RESTRECORD_URL_ROOT` (see [`Config`]),
//! fetches every record at the root, and writes them to stdout.

use restrecord_engine::{RecordType, SyncOptions};
use restrecord_http::{Config, ReqwestClient};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "restrecord=info,restrecord_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let url_root = config.require_url_root()?.to_string();

    let client = ReqwestClient::new(&config)?;
    tracing::info!(
        base_url = client.base_url().unwrap_or(""),
        %url_root,
        "fetching collection"
    );

    let records = RecordType::builder("Record")
        .url_root(url_root)
        .client(Arc::new(client))
        .build();

    let fetched = records.fetch_all(SyncOptions::new()).await?;
    tracing::info!(count = fetched.len(), "collection loaded");

    println!("{}", serde_json::to_string_pretty(&fetched)?);
    Ok(())
}
