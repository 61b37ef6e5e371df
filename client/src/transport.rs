//! Stream transport.
//!
//! A [`Transport`] opens one connection for a [`StreamRequest`] and hands back
//! the decoded events as a stream. The stream ends with `None` when the server
//! closes the connection cleanly, or yields a single `Err` when the connection
//! breaks.

use crate::{
    endpoint::StreamRequest,
    error::StreamError,
    sse::{SseDecoder, SseEvent},
};
use async_stream::stream;
use futures::stream::Stream;
use reqwest::{header, Client};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// Events of a single connection
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SseEvent, StreamError>> + Send>>;

/// Opens event stream connections.
pub trait Transport: Send + Sync {
    /// Open one connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the server
    /// rejects the request.
    fn open(
        &self,
        request: &StreamRequest,
    ) -> impl Future<Output = Result<EventStream, StreamError>> + Send;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
}

impl HttpTransport {
    /// Transport with a default `reqwest` client.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            user_agent: user_agent.into(),
        }
    }

    /// Transport with a connect timeout. No overall request timeout is set:
    /// stream connections are expected to stay open indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::RequestFailed` if the HTTP client cannot be built
    pub fn with_connect_timeout(
        user_agent: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, StreamError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
        })
    }
}

impl Transport for HttpTransport {
    async fn open(&self, request: &StreamRequest) -> Result<EventStream, StreamError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::USER_AGENT, &self.user_agent);
        if let Some(id) = &request.last_event_id {
            builder = builder.header("Last-Event-ID", id);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let byte_stream = response.bytes_stream();

        Ok(Box::pin(stream! {
            let mut decoder = SseDecoder::new();

            for await chunk in byte_stream {
                match chunk {
                    Ok(bytes) => {
                        for event in decoder.push(&bytes) {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(StreamError::StreamFailed(e.to_string()));
                        break;
                    }
                }
            }

            debug!("Server closed the event stream");
        }))
    }
}
