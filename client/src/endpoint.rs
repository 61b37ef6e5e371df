//! Subscription URL construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything the transport needs to open one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    /// Full stream URL including the `since` parameter, if any
    pub url: String,
    /// Value for the `Last-Event-ID` header, if any
    pub last_event_id: Option<String>,
}

impl StreamRequest {
    /// Request for `url` without a `Last-Event-ID`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            last_event_id: None,
        }
    }

    /// Attach a `Last-Event-ID` value.
    #[must_use]
    pub fn with_last_event_id(mut self, id: Option<&str>) -> Self {
        self.last_event_id = id.map(ToString::to_string);
        self
    }
}

/// Compose `base/stream`, appending `?since=<cursor>` when `cursor` is non-empty.
///
/// Trailing slashes on `base` are dropped. Characters of `cursor` that are
/// not allowed in a query value are percent-encoded.
///
/// ```rust
/// use eventstreams_client::endpoint::build_url;
///
/// assert_eq!(build_url("https://x/stream", "changes", ""), "https://x/stream/changes");
/// assert_eq!(
///     build_url("https://x/stream", "changes", "2024-01-01T00:00:00Z"),
///     "https://x/stream/changes?since=2024-01-01T00:00:00Z",
/// );
/// ```
#[must_use]
pub fn build_url(base: &str, stream: &str, cursor: &str) -> String {
    let mut url = format!("{}/{}", base.trim_end_matches('/'), stream);
    if !cursor.is_empty() {
        url.push_str("?since=");
        url.push_str(&encode_query_value(cursor));
    }
    url
}

/// Bytes escaped in a query value: everything except unreserved characters, `:` and `@`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b':')
    .remove(b'@');

/// Percent-encode a query value, keeping unreserved characters plus `:` and `@`.
#[must_use]
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_url_without_cursor() {
        assert_eq!(
            build_url("https://x/stream", "changes", ""),
            "https://x/stream/changes"
        );
    }

    #[test]
    fn test_url_with_cursor() {
        assert_eq!(
            build_url("https://x/stream", "changes", "2024-01-01T00:00:00Z"),
            "https://x/stream/changes?since=2024-01-01T00:00:00Z"
        );
    }

    #[test]
    fn test_trailing_slash_on_base() {
        assert_eq!(
            build_url("https://x/stream/", "recentchange", ""),
            "https://x/stream/recentchange"
        );
    }

    #[test]
    fn test_reserved_characters_are_encoded() {
        assert_eq!(
            build_url("https://x/stream", "changes", "2024-01-01T00:00:00+01:00"),
            "https://x/stream/changes?since=2024-01-01T00:00:00%2B01:00"
        );
        assert_eq!(encode_query_value("a b&c=d#e"), "a%20b%26c%3Dd%23e");
    }

    #[test]
    fn test_non_ascii_is_encoded_as_utf8() {
        assert_eq!(encode_query_value("Zürich"), "Z%C3%BCrich");
        assert_eq!(encode_query_value("user@host:~a_b.c-d"), "user@host:~a_b.c-d");
    }

    #[test]
    fn test_stream_request_last_event_id() {
        let request = StreamRequest::new("https://x/stream/changes")
            .with_last_event_id(Some("[{\"offset\":1}]"));
        assert_eq!(request.last_event_id.as_deref(), Some("[{\"offset\":1}]"));
    }

    proptest! {
        #[test]
        fn prop_encoded_value_has_no_query_delimiters(value in ".*") {
            let encoded = encode_query_value(&value);
            prop_assert!(!encoded.contains(['&', '=', '#', '+', ' ', '?']));
        }
    }
}
