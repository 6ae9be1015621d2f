//! Wire payloads for the `mlv.cgi` JSON endpoint, plus the request values
//! the session controller hands to the API client.
//!
//! Every response carries a `status` field (`"ok"` or an error word) and an
//! optional human-readable `message`. The transport layer only guarantees the
//! body is JSON; checking `status` is the consumer's job.

use crate::types::{lenient_opt_i64, lenient_opt_u64, null_as_default, LineLimit, LogDescriptor};
use serde::Deserialize;

/// `action=list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<LogDescriptor>,
    #[serde(default)]
    pub message: Option<String>,
}

/// File metadata attached to a tail response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TailMeta {
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub mtime: Option<i64>,
}

/// `action=tail`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TailPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lines: Vec<String>,
    #[serde(default)]
    pub meta: Option<TailMeta>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One log's hits in a search-all response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GlobalMatch {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matches: Vec<String>,
}

/// `action=search_all`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchAllPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub matches: Vec<GlobalMatch>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `api=update&action=check`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateCheckPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub current_version: Option<String>,
    #[serde(default)]
    pub remote_version: Option<String>,
    #[serde(default)]
    pub has_update: bool,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `api=update&action=update`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateApplyPayload {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub debug: Option<String>,
    #[serde(default)]
    pub exit_code: Option<serde_json::Value>,
    #[serde(default)]
    pub output: Option<String>,
}

/// True when a payload's `status` field reports success.
pub fn is_ok_status(status: &str) -> bool {
    status == "ok"
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Parameters of one tail request. Built only by the session controller, so
/// the query is already trimmed and the limit already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailRequest {
    pub id: String,
    pub lines: LineLimit,
    pub search: String,
    pub case_sensitive: bool,
}

/// Parameters of one cross-log search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAllRequest {
    pub search: String,
    pub lines: LineLimit,
    pub case_sensitive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_payload_with_meta() {
        let p: TailPayload = serde_json::from_value(serde_json::json!({
            "status": "ok",
            "lines": ["a", "b"],
            "meta": {"size": 10, "mtime": 1700000000}
        }))
        .unwrap();
        assert!(is_ok_status(&p.status));
        assert_eq!(p.lines, vec!["a", "b"]);
        assert_eq!(
            p.meta,
            Some(TailMeta {
                size: Some(10),
                mtime: Some(1_700_000_000)
            })
        );
    }

    #[test]
    fn error_payload_keeps_message() {
        let p: TailPayload = serde_json::from_value(serde_json::json!({
            "status": "error",
            "message": "Log not readable"
        }))
        .unwrap();
        assert!(!is_ok_status(&p.status));
        assert!(p.lines.is_empty());
        assert_eq!(p.message.as_deref(), Some("Log not readable"));
    }

    #[test]
    fn null_lists_read_as_empty() {
        let tail: TailPayload =
            serde_json::from_value(serde_json::json!({"status": "ok", "lines": null})).unwrap();
        assert!(tail.lines.is_empty());

        let list: ListPayload =
            serde_json::from_value(serde_json::json!({"status": "ok", "data": null})).unwrap();
        assert!(list.data.is_empty());

        let all: SearchAllPayload = serde_json::from_value(serde_json::json!({
            "status": "ok",
            "matches": [{"name": "Mail", "path": "/var/log/maillog", "matches": null}]
        }))
        .unwrap();
        assert_eq!(all.matches.len(), 1);
        assert!(all.matches[0].matches.is_empty());

        let none: SearchAllPayload =
            serde_json::from_value(serde_json::json!({"status": "ok", "matches": null})).unwrap();
        assert!(none.matches.is_empty());
    }
}
