//! Typed message dispatch.
//!
//! A [`Dispatcher`] pairs a handler with the record type it accepts. The
//! handler's parameter type is the decode target, so a handler that does not
//! take exactly one record is rejected by the compiler before any connection
//! is opened:
//!
//! ```compile_fail
//! use eventstreams_client::dispatch::Dispatcher;
//!
//! let dispatcher = Dispatcher::<serde_json::Value, _>::new(|a: serde_json::Value, b: u32| {});
//! ```
//!
//! Payload problems never stop the stream: empty payloads are ignored and
//! malformed ones are logged and skipped.

use crate::error::StreamError;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::warn;

/// What happened to one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Empty payload, handler not called
    Ignored,
    /// Payload did not decode into the record type, handler not called
    Skipped,
    /// Handler was called with the decoded record
    Delivered,
}

/// Decodes payloads into `T` and feeds them to a handler.
pub struct Dispatcher<T, F> {
    handler: F,
    _record: PhantomData<fn(T)>,
}

impl<T, F> Dispatcher<T, F>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    /// Attach a handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _record: PhantomData,
        }
    }

    /// Decode `payload` and invoke the handler synchronously.
    pub fn dispatch(&mut self, payload: &str) -> Dispatch {
        if payload.is_empty() {
            return Dispatch::Ignored;
        }

        match serde_json::from_str::<T>(payload) {
            Ok(record) => {
                (self.handler)(record);
                Dispatch::Delivered
            }
            Err(e) => {
                let err = StreamError::Decode(e);
                warn!(
                    error = %err,
                    record_type = std::any::type_name::<T>(),
                    "Skipping event that failed to decode"
                );
                Dispatch::Skipped
            }
        }
    }
}

impl<T, F> std::fmt::Debug for Dispatcher<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("record_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Change {
        id: u64,
        title: String,
    }

    #[test]
    fn test_delivers_decoded_record() {
        let mut received = Vec::new();
        let mut dispatcher = Dispatcher::new(|change: Change| received.push(change));

        let outcome = dispatcher.dispatch(r#"{"id": 1, "title": "Main Page"}"#);
        assert_eq!(outcome, Dispatch::Delivered);
        drop(dispatcher);

        assert_eq!(
            received,
            vec![Change {
                id: 1,
                title: "Main Page".to_string()
            }]
        );
    }

    #[test]
    fn test_empty_payload_is_ignored() {
        let mut calls = 0;
        let mut dispatcher = Dispatcher::new(|_: Change| calls += 1);

        assert_eq!(dispatcher.dispatch(""), Dispatch::Ignored);
        drop(dispatcher);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let mut received = Vec::new();
        let mut dispatcher = Dispatcher::new(|change: Change| received.push(change.id));

        assert_eq!(dispatcher.dispatch("{not json"), Dispatch::Skipped);
        assert_eq!(dispatcher.dispatch(r#"{"id": "wrong type"}"#), Dispatch::Skipped);
        assert_eq!(
            dispatcher.dispatch(r#"{"id": 2, "title": "Talk:Sandbox"}"#),
            Dispatch::Delivered
        );
        drop(dispatcher);

        assert_eq!(received, vec![2]);
    }

    #[test]
    fn test_untyped_records() {
        let mut titles = Vec::new();
        let mut dispatcher = Dispatcher::new(|value: serde_json::Value| {
            titles.push(value["title"].as_str().map(ToString::to_string));
        });

        dispatcher.dispatch(r#"{"title": "Rust"}"#);
        drop(dispatcher);
        assert_eq!(titles, vec![Some("Rust".to_string())]);
    }
}
