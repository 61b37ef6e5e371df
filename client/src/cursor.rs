//! Resumption cursor.
//!
//! Tracks two related positions:
//!
//! - the liveness timestamp of the last successfully delivered message, which
//!   drives the backoff reset decision
//! - the `since` value sent on the next (re)connect, which is advanced to the
//!   liveness timestamp before every retry
//!
//! It also remembers the last SSE `id:` seen so the transport can send it back
//! as `Last-Event-ID`.
//!
//! The `since` value never moves backwards once advanced.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Resumption state owned by one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    since: Option<String>,
    since_at: Option<DateTime<Utc>>,
    last_delivery: Option<DateTime<Utc>>,
    last_event_id: Option<String>,
}

impl Cursor {
    /// Empty cursor: the first request carries no `since` parameter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor that starts at a known position, e.g. a value previously
    /// returned by [`Cursor::position`]. Empty strings are treated as no
    /// position.
    #[must_use]
    pub fn resume_from(since: impl Into<String>) -> Self {
        let since = since.into();
        if since.is_empty() {
            return Self::default();
        }
        let since_at = DateTime::parse_from_rfc3339(&since)
            .ok()
            .map(|at| at.with_timezone(&Utc));
        Self {
            since: Some(since),
            since_at,
            ..Self::default()
        }
    }

    /// Value for the `since` query parameter of the next request.
    #[must_use]
    pub fn since(&self) -> Option<&str> {
        self.since.as_deref()
    }

    /// Time of the last successfully delivered message.
    #[must_use]
    pub const fn last_delivery(&self) -> Option<DateTime<Utc>> {
        self.last_delivery
    }

    /// Last SSE event id received from the server.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Record a successful delivery at `at`.
    pub fn record_delivery(&mut self, at: DateTime<Utc>) {
        if self.last_delivery.is_none_or(|previous| at > previous) {
            self.last_delivery = Some(at);
        }
    }

    /// Remember the server-assigned id of the latest event.
    pub fn record_event_id(&mut self, id: impl Into<String>) {
        self.last_event_id = Some(id.into());
    }

    /// Time elapsed between the last delivery and `now`.
    ///
    /// Zero when nothing has been delivered yet, so a client that never
    /// received a message never resets its retry budget.
    #[must_use]
    pub fn elapsed_since_delivery(&self, now: DateTime<Utc>) -> Duration {
        self.last_delivery
            .and_then(|at| (now - at).to_std().ok())
            .unwrap_or_default()
    }

    /// Move `since` up to the last delivery timestamp.
    ///
    /// Returns `true` if the cursor changed.
    pub fn advance(&mut self) -> bool {
        let Some(delivered) = self.pending_advance() else {
            return false;
        };
        self.since = Some(format_position(delivered));
        self.since_at = Some(delivered);
        true
    }

    /// Most recent resumption position: the last delivery timestamp if it is
    /// ahead of `since`, otherwise `since` itself.
    #[must_use]
    pub fn position(&self) -> Option<String> {
        self.pending_advance()
            .map(format_position)
            .or_else(|| self.since.clone())
    }

    fn pending_advance(&self) -> Option<DateTime<Utc>> {
        let delivered = self.last_delivery?;
        match self.since_at {
            Some(since_at) if delivered <= since_at => None,
            _ => Some(delivered),
        }
    }
}

fn format_position(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
