//! Server-sent events decoding
//!
//! Incremental decoder for the `text/event-stream` format. Bytes are pushed in
//! arbitrary chunks as they arrive from the network; complete events come out
//! once their terminating blank line has been seen.
//!
//! Line types:
//! - `event: <name>` - event name (defaults to `message`)
//! - `data: <payload>` - payload line, multiple lines joined with `\n`
//! - `id: <id>` - event id, remembered for `Last-Event-ID`
//! - `retry: <ms>` - reconnection hint from the server
//! - `:<comment>` - ignored (used by servers as keep-alive)
//! - empty line - dispatches the pending event
//!
//! A line that is not valid UTF-8 poisons the event it belongs to; that event
//! is dropped with a warning instead of being delivered with replaced bytes.

use tracing::warn;

/// Event name used when the server sends none
pub const DEFAULT_EVENT: &str = "message";

/// One decoded server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name
    pub event: String,
    /// Payload, possibly empty
    pub data: String,
    /// Event id, if the event carried one
    pub id: Option<String>,
    /// Reconnection time hint in milliseconds
    pub retry: Option<u64>,
}

impl SseEvent {
    /// A `message` event carrying `data`.
    #[must_use]
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: DEFAULT_EVENT.to_string(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Whether this is a `message` event.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT
    }
}

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
    retry: Option<u64>,
    invalid: bool,
}

impl SseDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and collect every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let Ok(line) = std::str::from_utf8(&line) else {
                self.invalid = true;
                continue;
            };
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => match self.data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(ms);
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if std::mem::take(&mut self.invalid) {
            let id = self.id.take();
            self.event = None;
            self.data = None;
            self.retry = None;
            warn!(id = ?id, "Dropping event with invalid UTF-8");
            return None;
        }
        if self.event.is_none() && self.data.is_none() && self.id.is_none() && self.retry.is_none()
        {
            return None;
        }

        Some(SseEvent {
            event: self
                .event
                .take()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data: self.data.take().unwrap_or_default(),
            id: self.id.take(),
            retry: self.retry.take(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: message\nid: 7\ndata: {\"a\":1}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "{\"a\":1}");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"title\":").is_empty());
        assert!(decoder.push(b"\"Main Page\"}\n").is_empty());

        let events = decoder.push(b"\n");
        assert_eq!(events, vec![SseEvent::message("{\"title\":\"Main Page\"}")]);
    }

    #[test]
    fn test_multiline_data_and_crlf() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: first\r\ndata: second\r\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn test_comments_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b":ok\n\n: keep-alive\n\ndata: x\n\n");

        assert_eq!(events, vec![SseEvent::message("x")]);
    }

    #[test]
    fn test_empty_data_is_still_dispatched() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: message\ndata:\n\n");

        assert_eq!(events.len(), 1);
        assert!(events[0].data.is_empty());
        assert!(events[0].is_message());
    }

    #[test]
    fn test_named_event_and_retry_hint() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: error\nretry: 2000\ndata: boom\n\n");

        assert_eq!(events[0].event, "error");
        assert_eq!(events[0].retry, Some(2000));
        assert!(!events[0].is_message());
    }

    #[test]
    fn test_invalid_utf8_event_is_dropped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"title\":\"\xff\xfe\"}\n\ndata: ok\n\n");

        assert_eq!(events, vec![SseEvent::message("ok")]);
    }

    #[test]
    fn test_invalid_utf8_poisons_only_its_own_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"id: 1\ndata: a\ndata: \xc3\n\nid: 2\ndata: b\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "b");
        assert_eq!(events[0].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_incomplete_event_is_held_back() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: one\n\ndata: two\n");

        assert_eq!(events, vec![SseEvent::message("one")]);
    }
}
