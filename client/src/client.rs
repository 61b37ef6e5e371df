//! Reconnecting event stream client.
//!
//! [`EventStreamsClient::subscribe`] owns the whole connection lifecycle:
//!
//! 1. Build the stream URL from the base address, stream name and cursor
//! 2. Open a connection and dispatch every `message` event to the handler
//! 3. Return `Ok(())` when the server ends the stream cleanly
//! 4. On a transport failure, back off and reconnect from the last delivered
//!    position, or give up once the retry ceiling is reached
//!
//! A failure that arrives more than the reset window after the last delivered
//! message starts the attempt counter over. The gateway cycles idle
//! connections on a fixed schedule, and those drops should not use up the
//! retry budget.

use crate::{
    backoff::Backoff,
    clock::{Clock, SystemClock},
    config::{BackoffConfig, ClientConfig, DEFAULT_BASE_URL},
    cursor::Cursor,
    dispatch::{Dispatch, Dispatcher},
    endpoint::{build_url, StreamRequest},
    error::StreamError,
    transport::{HttpTransport, Transport},
};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Event stream client
///
/// Holds the base address, the resumption cursor and the reconnect policy.
/// `subscribe` borrows the client mutably, so one client runs at most one
/// subscription at a time; independent clients never share a cursor.
#[derive(Debug)]
pub struct EventStreamsClient<T = HttpTransport, C = SystemClock> {
    config: ClientConfig,
    transport: T,
    clock: C,
    cursor: Cursor,
    predicates: BTreeMap<String, Value>,
}

impl EventStreamsClient {
    /// Create a client for `base_url` with default settings
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = ClientConfig {
            base_url: base_url.into(),
            ..ClientConfig::default()
        };
        let transport = HttpTransport::new(config.user_agent.clone());
        Self::with_parts(config, transport, SystemClock)
    }

    /// Create a client from an explicit configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built
    pub fn from_config(config: ClientConfig) -> Result<Self, StreamError> {
        config.validate()?;
        let transport =
            HttpTransport::with_connect_timeout(config.user_agent.clone(), config.connect_timeout())?;
        Ok(Self::with_parts(config, transport, SystemClock))
    }

    /// Create a client from `EVENTSTREAMS_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the configuration is invalid
    pub fn from_env() -> Result<Self, StreamError> {
        Self::from_config(ClientConfig::from_env()?)
    }
}

impl Default for EventStreamsClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl<T, C> EventStreamsClient<T, C>
where
    T: Transport,
    C: Clock,
{
    /// Assemble a client from its parts
    #[must_use]
    pub fn with_parts(config: ClientConfig, transport: T, clock: C) -> Self {
        Self {
            config,
            transport,
            clock,
            cursor: Cursor::new(),
            predicates: BTreeMap::new(),
        }
    }

    /// Replace the transport
    #[must_use]
    pub fn with_transport<U: Transport>(self, transport: U) -> EventStreamsClient<U, C> {
        EventStreamsClient {
            config: self.config,
            transport,
            clock: self.clock,
            cursor: self.cursor,
            predicates: self.predicates,
        }
    }

    /// Replace the clock used for liveness timestamps
    #[must_use]
    pub fn with_clock<D: Clock>(self, clock: D) -> EventStreamsClient<T, D> {
        EventStreamsClient {
            config: self.config,
            transport: self.transport,
            clock,
            cursor: self.cursor,
            predicates: self.predicates,
        }
    }

    /// Replace the reconnect policy
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Resume from a known position, e.g. the [`last_position`](Self::last_position)
    /// of an earlier client
    #[must_use]
    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.cursor = Cursor::resume_from(since);
        self
    }

    /// Record a match predicate on a JSON attribute.
    ///
    /// Predicates are stored for inspection only. They are not evaluated and
    /// every event is still delivered to the handler.
    #[must_use]
    pub fn matching(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.insert(attribute.into(), value.into());
        self
    }

    /// Recorded match predicates
    #[must_use]
    pub const fn predicates(&self) -> &BTreeMap<String, Value> {
        &self.predicates
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Resumption state
    #[must_use]
    pub const fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Most recent resumption position, usable with [`with_since`](Self::with_since)
    #[must_use]
    pub fn last_position(&self) -> Option<String> {
        self.cursor.position()
    }

    /// Subscribe to `stream`, calling `handler` once per decoded record.
    ///
    /// Blocks until the server ends the stream cleanly or the retry budget is
    /// exhausted. Messages are handled one at a time, in arrival order; the
    /// next message is not read until `handler` returns. Records may be
    /// delivered twice across a reconnect.
    ///
    /// # Errors
    ///
    /// Returns the last transport error once the retry ceiling is reached, or
    /// a configuration error before any connection is attempted.
    pub async fn subscribe<R, F>(&mut self, stream: &str, handler: F) -> Result<(), StreamError>
    where
        R: DeserializeOwned,
        F: FnMut(R),
    {
        let mut dispatcher = Dispatcher::new(handler);
        self.run(stream, &mut dispatcher).await
    }

    /// Like [`subscribe`](Self::subscribe), but also returns `Ok(())` as soon
    /// as `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    pub async fn subscribe_until<R, F, S>(
        &mut self,
        stream: &str,
        handler: F,
        shutdown: S,
    ) -> Result<(), StreamError>
    where
        R: DeserializeOwned,
        F: FnMut(R),
        S: Future<Output = ()>,
    {
        let mut dispatcher = Dispatcher::new(handler);
        tokio::select! {
            result = self.run(stream, &mut dispatcher) => result,
            () = shutdown => {
                info!(stream, "Shutdown requested, closing subscription");
                Ok(())
            }
        }
    }

    async fn run<R, F>(
        &mut self,
        stream: &str,
        dispatcher: &mut Dispatcher<R, F>,
    ) -> Result<(), StreamError>
    where
        R: DeserializeOwned,
        F: FnMut(R),
    {
        self.config.backoff.validate()?;
        validate_target(&self.config.base_url, stream)?;
        if !self.predicates.is_empty() {
            debug!(
                predicates = ?self.predicates,
                "Match predicates are recorded but not applied"
            );
        }

        let mut backoff = Backoff::new(&self.config.backoff);
        let reset_window = self.config.backoff.reset_window();

        loop {
            let url = build_url(
                &self.config.base_url,
                stream,
                self.cursor.since().unwrap_or_default(),
            );
            let request = StreamRequest::new(url).with_last_event_id(self.cursor.last_event_id());

            let Err(err) = self.consume(&request, dispatcher).await else {
                info!(stream, "Event stream ended");
                return Ok(());
            };

            if !err.is_retryable() {
                return Err(err);
            }

            let elapsed = self.cursor.elapsed_since_delivery(self.clock.now());
            if elapsed >= reset_window {
                debug!(
                    stream,
                    elapsed_secs = elapsed.as_secs(),
                    "Last delivery outside reset window, resetting backoff"
                );
                backoff.reset();
            }

            let delay = backoff.next_delay();
            warn!(
                stream,
                attempt = backoff.attempt(),
                delay_ms = delay.as_millis(),
                error = %err,
                "Event stream connection lost, backing off"
            );
            tokio::time::sleep(delay).await;

            if backoff.attempt() >= self.config.backoff.max_retries {
                error!(
                    stream,
                    attempt = backoff.attempt(),
                    error = %err,
                    "Event stream failed after max retries"
                );
                return Err(err);
            }

            if self.cursor.advance() {
                debug!(stream, since = ?self.cursor.since(), "Resuming from last delivery");
            }
        }
    }

    async fn consume<R, F>(
        &mut self,
        request: &StreamRequest,
        dispatcher: &mut Dispatcher<R, F>,
    ) -> Result<(), StreamError>
    where
        R: DeserializeOwned,
        F: FnMut(R),
    {
        info!(url = %request.url, "Connecting to event stream");
        let mut events = self.transport.open(request).await?;

        while let Some(event) = events.next().await {
            let event = event?;
            if let Some(id) = event.id.as_deref() {
                self.cursor.record_event_id(id);
            }
            if !event.is_message() {
                debug!(event = %event.event, "Ignoring non-message event");
                continue;
            }

            match dispatcher.dispatch(&event.data) {
                Dispatch::Delivered => self.cursor.record_delivery(self.clock.now()),
                Dispatch::Ignored | Dispatch::Skipped => {}
            }
        }

        Ok(())
    }
}

fn validate_target(base_url: &str, stream: &str) -> Result<(), StreamError> {
    if stream.is_empty() || stream.contains(['/', '?', '#']) {
        return Err(StreamError::InvalidUrl(format!("invalid stream name: {stream:?}")));
    }
    let url = build_url(base_url, stream, "");
    let parsed =
        reqwest::Url::parse(&url).map_err(|e| StreamError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(StreamError::InvalidUrl(format!(
            "{url}: unsupported scheme {}",
            parsed.scheme()
        )));
    }
    Ok(())
}
