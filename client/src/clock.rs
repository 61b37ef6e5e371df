//! Time source used for liveness timestamps.
//!
//! The reconnection loop asks a [`Clock`] when a message was delivered and
//! when a connection failed. Production code uses [`SystemClock`]; tests
//! substitute a clock they can move forward by hand.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
