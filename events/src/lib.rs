//! # EventStreams Records
//!
//! Record types for the public MediaWiki event streams. Pass one of them as the
//! parameter type of a subscription handler to select how payloads are decoded.
//!
//! ```no_run
//! use eventstreams_client::EventStreamsClient;
//! use eventstreams_events::{RecentChangeEvent, RECENT_CHANGE};
//!
//! # async fn example() -> Result<(), eventstreams_client::StreamError> {
//! let mut client = EventStreamsClient::default();
//! client
//!     .subscribe(RECENT_CHANGE, |event: RecentChangeEvent| {
//!         println!("{} on {}", event.title, event.wiki);
//!     })
//!     .await
//! # }
//! ```
//!
//! Every field defaults when absent, so records decode across schema versions.

use serde::{Deserialize, Serialize};

/// Stream name of the recent changes feed
pub const RECENT_CHANGE: &str = "recentchange";

/// Stream name of the revision creation feed
pub const REVISION_CREATE: &str = "revision-create";

/// Envelope metadata shared by every event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Meta {
    /// Unique URI identifying the event or entity
    pub uri: String,
    /// Id of the request that caused the event
    pub request_id: String,
    /// Unique id of this event
    pub id: String,
    /// Event time, ISO-8601
    pub dt: String,
    /// Domain the event pertains to
    pub domain: String,
    /// Stream name
    pub stream: String,
    /// Kafka topic the event was read from
    pub topic: String,
    /// Kafka partition
    pub partition: i64,
    /// Kafka offset
    pub offset: i64,
}

/// Old and new values of a changed quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Change {
    /// Value before the change
    pub old: Option<i64>,
    /// Value after the change
    pub new: Option<i64>,
}

/// Event from the `recentchange` stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentChangeEvent {
    /// JSON schema URI
    #[serde(rename = "$schema")]
    pub schema: String,
    /// Recent changes id
    pub id: Option<i64>,
    /// Envelope metadata
    pub meta: Meta,
    /// Change type (`edit`, `new`, `log`, `categorize`, `external`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Namespace id of the affected page
    pub namespace: i64,
    /// Page title
    pub title: String,
    /// Edit summary
    pub comment: String,
    /// Unix timestamp of the change
    pub timestamp: i64,
    /// User name
    pub user: String,
    /// Made by a bot
    pub bot: bool,
    /// Marked as a minor edit
    pub minor: bool,
    /// Marked as patrolled
    pub patrolled: bool,
    /// Page length in bytes before and after
    pub length: Change,
    /// Revision ids before and after
    pub revision: Change,
    /// Canonical server URL
    pub server_url: String,
    /// Server host name
    pub server_name: String,
    /// Script path on the server
    pub server_script_path: String,
    /// Wiki database name
    pub wiki: String,
    /// Edit summary rendered as HTML
    #[serde(rename = "parsedcomment")]
    pub parsed_comment: String,
}

/// User who performed an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Performer {
    /// User name or IP
    pub user_text: String,
    /// Groups the user belongs to
    pub user_groups: Vec<String>,
    /// Whether the user is a bot
    pub user_is_bot: bool,
    /// User id, absent for anonymous users
    pub user_id: Option<i64>,
    /// Registration time, ISO-8601
    pub user_registration_dt: Option<String>,
    /// Number of edits
    pub user_edit_count: Option<i64>,
}

/// Content slot of a revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slot {
    /// Content model of the slot
    pub rev_slot_content_model: String,
    /// SHA-1 of the slot content
    pub rev_slot_sha1: String,
    /// Slot size in bytes
    pub rev_slot_size: i64,
    /// Revision the slot content originated from
    pub rev_slot_origin_rev_id: i64,
}

/// Slots of a revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevSlots {
    /// Main content slot
    pub main: Slot,
}

/// Event from the `revision-create` stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionCreateEvent {
    /// JSON schema URI
    #[serde(rename = "$schema")]
    pub schema: String,
    /// Envelope metadata
    pub meta: Meta,
    /// Wiki database name
    pub database: String,
    /// Page id
    pub page_id: i64,
    /// Page title
    pub page_title: String,
    /// Namespace id of the page
    pub page_namespace: i64,
    /// Revision id
    pub rev_id: i64,
    /// Revision time, ISO-8601
    pub rev_timestamp: String,
    /// SHA-1 of the revision content
    pub rev_sha1: String,
    /// Marked as a minor edit
    pub rev_minor_edit: bool,
    /// Revision length in bytes
    pub rev_len: i64,
    /// Content model
    pub rev_content_model: String,
    /// Content format
    pub rev_content_format: String,
    /// User who created the revision
    pub performer: Performer,
    /// Whether the page is a redirect
    pub page_is_redirect: bool,
    /// Edit summary
    pub comment: String,
    /// Edit summary rendered as HTML
    #[serde(rename = "parsedcomment")]
    pub parsed_comment: String,
    /// Parent revision id
    pub rev_parent_id: Option<i64>,
    /// Event time, ISO-8601
    pub dt: String,
    /// Content slots
    pub rev_slots: RevSlots,
    /// Whether the content changed relative to the parent revision
    pub rev_content_changed: bool,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use eventstreams_client::dispatch::{Dispatch, Dispatcher};

    const RECENT_CHANGE_PAYLOAD: &str = r#"{
        "$schema": "/mediawiki/recentchange/1.0.0",
        "meta": {
            "uri": "https://en.wikipedia.org/wiki/Rust",
            "request_id": "abc",
            "id": "0d9e",
            "dt": "2024-01-01T00:00:00Z",
            "domain": "en.wikipedia.org",
            "stream": "mediawiki.recentchange",
            "topic": "eqiad.mediawiki.recentchange",
            "partition": 0,
            "offset": 5012
        },
        "id": 1700000000,
        "type": "edit",
        "namespace": 0,
        "title": "Rust",
        "comment": "typo",
        "timestamp": 1704067200,
        "user": "Alice",
        "bot": false,
        "minor": true,
        "length": {"old": 120, "new": 118},
        "revision": {"old": 10, "new": 11},
        "server_url": "https://en.wikipedia.org",
        "server_name": "en.wikipedia.org",
        "server_script_path": "/w",
        "wiki": "enwiki",
        "parsedcomment": "typo"
    }"#;

    #[test]
    fn test_recent_change_decodes() {
        let event: RecentChangeEvent = serde_json::from_str(RECENT_CHANGE_PAYLOAD).unwrap();

        assert_eq!(event.schema, "/mediawiki/recentchange/1.0.0");
        assert_eq!(event.kind, "edit");
        assert_eq!(event.title, "Rust");
        assert_eq!(event.meta.offset, 5012);
        assert_eq!(event.length, Change { old: Some(120), new: Some(118) });
        assert_eq!(event.revision.new, Some(11));
        assert!(event.minor);
        assert!(!event.patrolled);
    }

    #[test]
    fn test_log_event_without_length_decodes() {
        let event: RecentChangeEvent =
            serde_json::from_str(r#"{"type": "log", "title": "User:Bob", "wiki": "dewiki"}"#)
                .unwrap();

        assert_eq!(event.kind, "log");
        assert_eq!(event.id, None);
        assert_eq!(event.length, Change::default());
    }

    #[test]
    fn test_revision_create_decodes() {
        let event: RevisionCreateEvent = serde_json::from_str(
            r#"{
                "$schema": "/mediawiki/revision/create/2.0.0",
                "database": "enwiki",
                "page_id": 42,
                "page_title": "Rust",
                "rev_id": 11,
                "rev_parent_id": 10,
                "performer": {"user_text": "Alice", "user_groups": ["*", "user"], "user_is_bot": false},
                "rev_slots": {"main": {"rev_slot_content_model": "wikitext", "rev_slot_size": 118}},
                "rev_content_changed": true
            }"#,
        )
        .unwrap();

        assert_eq!(event.page_id, 42);
        assert_eq!(event.rev_parent_id, Some(10));
        assert_eq!(event.performer.user_groups, vec!["*", "user"]);
        assert_eq!(event.performer.user_id, None);
        assert_eq!(event.rev_slots.main.rev_slot_content_model, "wikitext");
        assert!(event.rev_content_changed);
    }

    #[test]
    fn test_dispatches_as_handler_record() {
        let mut titles = Vec::new();
        let mut dispatcher =
            Dispatcher::new(|event: RecentChangeEvent| titles.push(event.title));

        assert_eq!(dispatcher.dispatch(RECENT_CHANGE_PAYLOAD), Dispatch::Delivered);
        drop(dispatcher);
        assert_eq!(titles, vec!["Rust".to_string()]);
    }
}
