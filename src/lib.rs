//! # sl-export
//!
//! Paginated, retrying data export from the SAP Business One Service Layer.
//!
//! ## Design Philosophy
//!
//! sl-export is designed to be:
//! - **Resilient** - Transient server failures (429, 5xx) are retried with exponential backoff
//! - **Streaming** - Collections are pulled one page at a time, never held in memory
//! - **Lenient** - Continuation links in any of the common shapes are followed
//! - **Library-first** - The `sl-export` binary is a thin layer over this crate
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use sl_export::{CollectionQuery, Config, HttpTransport, RequestExecutor, stream_collection};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::new("https://erp.example.com:50000/b1s/v1");
//!     config.service.company_db = "SBODEMO".to_string();
//!     config.service.username = "manager".to_string();
//!     config.service.password = "secret".to_string();
//!
//!     let transport = HttpTransport::connect(&config).await?;
//!     let executor = RequestExecutor::new(Arc::new(transport), &config)?;
//!
//!     let query = CollectionQuery::new("Items").select("ItemCode,ItemName");
//!     let mut items = stream_collection(&executor, query);
//!     while let Some(item) = items.try_next().await? {
//!         println!("{:?}", item.get("ItemCode"));
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Advisory total-count probe
pub mod count;
/// Error types
pub mod error;
/// Resilient request execution
pub mod executor;
/// CSV export routines
pub mod export;
/// Bounded concurrent lookups
pub mod fan_out;
/// Collection query clauses
pub mod query;
/// Records and collection pages
pub mod record;
/// Retry logic with exponential backoff
pub mod retry;
/// Paginated collection streaming
pub mod stream;
/// HTTP transport and login
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{Config, ExportConfig, PaginationConfig, RetryConfig, ServiceConfig};
pub use count::count;
pub use error::{Error, Result};
pub use executor::RequestExecutor;
pub use export::{ExportSummary, Exporter, ItemPrice, StockSummary};
pub use fan_out::{FanOutSummary, fan_out, fan_out_collect};
pub use query::{CollectionQuery, escape_literal};
pub use record::{Page, Record};
pub use retry::{IsRetryable, with_retry};
pub use stream::{RecordStream, stream_collection};
pub use transport::{HttpTransport, RawResponse, Transport};
