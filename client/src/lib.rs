//! # EventStreams Client
//!
//! Long-lived client for server-sent event streams of JSON change records.
//! Each `message` event is decoded into the record type the handler accepts;
//! dropped connections are resumed from the last delivered position with
//! bounded exponential backoff.
//!
//! ## Example
//!
//! ```no_run
//! use eventstreams_client::EventStreamsClient;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Change {
//!     title: String,
//!     user: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = EventStreamsClient::default();
//!
//!     client
//!         .subscribe("recentchange", |change: Change| {
//!             println!("{} edited {}", change.user, change.title);
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - Typed dispatch: the handler's parameter type selects the decode target
//! - Malformed or empty payloads are skipped without dropping the connection
//! - Resumption via `since` and `Last-Event-ID` after a reconnect
//! - Retry budget that resets when the last delivery is older than the reset window
//! - Pluggable transport and clock for testing

pub mod backoff;
pub mod client;
pub mod clock;
pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod sse;
pub mod transport;

// Re-export main types for convenience
pub use client::EventStreamsClient;
pub use clock::{Clock, SystemClock};
pub use config::{BackoffConfig, ClientConfig, DEFAULT_BASE_URL};
pub use cursor::Cursor;
pub use endpoint::{build_url, StreamRequest};
pub use error::{ConfigError, StreamError};
pub use sse::SseEvent;
pub use transport::{EventStream, HttpTransport, Transport};
