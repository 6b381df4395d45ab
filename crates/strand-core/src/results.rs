//! Inbound wire types.
//!
//! The server pushes each result set as one text frame whose payload is a
//! top-level JSON array of results. Anything else — invalid JSON, a JSON
//! non-array, or an array whose elements do not decode — is dropped by the
//! caller without touching state: one lost push is harmless because a later
//! push supersedes it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single search hit as delivered by the server.
///
/// `id` is unique within one result set only, not globally. Order within a
/// set is server-ranked and preserved as received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Identifier, unique within one result set.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Server-assigned relevance score.
    pub score: f64,
}

/// Parse an inbound payload into an ordered result set.
///
/// Returns `None` for any payload that is not a JSON array of well-formed
/// results. The caller treats `None` as "discard silently".
#[must_use]
pub fn parse_result_set(payload: &str) -> Option<Vec<SearchResult>> {
    let value: Value = serde_json::from_str(payload).ok()?;
    if !value.is_array() {
        return None;
    }
    serde_json::from_value(value).ok()
}
