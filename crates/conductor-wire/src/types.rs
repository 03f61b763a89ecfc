//! In-memory shapes of the wire frames.

use serde::{Deserialize, Serialize};

/// Structured wire value. Msgpack maps deserialize to ordered key/value
/// pairs, so field order survives the round trip — the response-key
/// matching rule depends on that.
pub type Value = rmpv::Value;

/// Outer frame: a correlation id plus opaque inner bytes.
///
/// The id is echoed verbatim on the reply; the mock never inspects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id, opaque to the mock.
    pub id: Value,
    /// Msgpack-encoded [`Request`].
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// Inner frame: which operation is being requested, with what data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Request tag, one of [`crate::tags::REQUEST_TAGS`] (minus the
    /// sentinel) on well-formed traffic.
    #[serde(rename = "type")]
    pub tag: String,
    /// Arbitrary keyed structure accompanying the request.
    pub data: Value,
}

impl Request {
    /// Build a request from a tag and data value.
    pub fn new(tag: impl Into<String>, data: Value) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }
}

/// A decoded reply, with the doubled zome-call layer already unwrapped.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResponse {
    /// Correlation id echoed from the request envelope.
    pub id: Value,
    /// Reply tag: the request tag, or [`crate::tags::ERROR`].
    pub tag: String,
    /// Response payload.
    pub data: Value,
}
