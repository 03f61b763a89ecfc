//! Bidirectional conversion between conductor frames and bytes.
//!
//! All map-shaped frames are encoded with `rmp_serde::to_vec_named` so the
//! wire carries string-keyed msgpack maps, byte-compatible with the
//! `@msgpack/msgpack` encoding the real conductor API uses.

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

use crate::error::{Result, WireError};
use crate::tags;
use crate::types::{DecodedResponse, Envelope, Request, Value};

/// Outer reply frame: `{type: "Response", id, data}`.
#[derive(Serialize, Deserialize)]
struct ReplyFrame {
    #[serde(rename = "type")]
    tag: String,
    id: Value,
    data: ByteBuf,
}

/// Inner reply: `{type, data}` carried inside [`ReplyFrame::data`].
#[derive(Serialize, Deserialize)]
struct InnerReply {
    #[serde(rename = "type")]
    tag: String,
    data: Value,
}

/// Outer signal frame: `{type: "Signal", data}`.
#[derive(Serialize, Deserialize)]
struct SignalFrame {
    #[serde(rename = "type")]
    tag: String,
    data: ByteBuf,
}

/// Inner signal: `{App: [cell_id, bytes(payload)]}`.
#[derive(Serialize, Deserialize)]
struct SignalInner {
    #[serde(rename = "App")]
    app: (Value, ByteBuf),
}

/// Decode an outer request envelope.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope> {
    rmp_serde::from_slice(bytes).map_err(|e| WireError::malformed("envelope", e))
}

/// Decode the inner request carried in an envelope's `data` bytes.
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    rmp_serde::from_slice(bytes).map_err(|e| WireError::malformed("request", e))
}

/// Encode an outer request envelope (client-side half, used by tests).
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(envelope).map_err(|e| WireError::encode("envelope", e))
}

/// Encode an inner request (client-side half, used by tests).
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(request).map_err(|e| WireError::encode("request", e))
}

/// Encode a reply frame.
///
/// `reply_tag` is what the caller sees (`request_tag`, or [`tags::ERROR`]
/// for synthesized errors); `request_tag` decides the extra encoding layer:
/// zome-call responses are doubly wrapped — the payload bytes are
/// themselves a msgpack-encoded value — mirroring the real protocol. The
/// doubling follows the *request* tag, so even an error reply to a zome
/// call is doubly encoded.
pub fn encode_response(
    reply_tag: &str,
    request_tag: &str,
    id: Value,
    payload: Value,
) -> Result<Vec<u8>> {
    let payload = if request_tag == tags::ZOME_CALL {
        let wrapped =
            rmp_serde::to_vec_named(&payload).map_err(|e| WireError::encode("zome payload", e))?;
        Value::Binary(wrapped)
    } else {
        payload
    };

    let inner = InnerReply {
        tag: reply_tag.to_owned(),
        data: payload,
    };
    let inner_bytes =
        rmp_serde::to_vec_named(&inner).map_err(|e| WireError::encode("response body", e))?;

    let frame = ReplyFrame {
        tag: tags::RESPONSE.to_owned(),
        id,
        data: ByteBuf::from(inner_bytes),
    };
    rmp_serde::to_vec_named(&frame).map_err(|e| WireError::encode("response", e))
}

/// Decode a reply frame, unwrapping the doubled zome-call layer.
///
/// Client-side half; this is what a real conductor-api client does with
/// the bytes the mock sends back.
pub fn decode_response(bytes: &[u8], request_tag: &str) -> Result<DecodedResponse> {
    let frame: ReplyFrame =
        rmp_serde::from_slice(bytes).map_err(|e| WireError::malformed("response", e))?;
    let inner: InnerReply =
        rmp_serde::from_slice(&frame.data).map_err(|e| WireError::malformed("response body", e))?;

    let data = match inner.data {
        Value::Binary(wrapped) if request_tag == tags::ZOME_CALL => {
            rmp_serde::from_slice(&wrapped).map_err(|e| WireError::malformed("zome payload", e))?
        }
        other => other,
    };

    Ok(DecodedResponse {
        id: frame.id,
        tag: inner.tag,
        data,
    })
}

/// Encode an unsolicited app-signal frame for the given cell.
pub fn encode_signal(cell_id: Value, payload: Value) -> Result<Vec<u8>> {
    let payload_bytes =
        rmp_serde::to_vec_named(&payload).map_err(|e| WireError::encode("signal payload", e))?;
    let inner = SignalInner {
        app: (cell_id, ByteBuf::from(payload_bytes)),
    };
    let inner_bytes =
        rmp_serde::to_vec_named(&inner).map_err(|e| WireError::encode("signal body", e))?;
    let frame = SignalFrame {
        tag: tags::SIGNAL.to_owned(),
        data: ByteBuf::from(inner_bytes),
    };
    rmp_serde::to_vec_named(&frame).map_err(|e| WireError::encode("signal", e))
}

/// Decode an app-signal frame into `(cell_id, payload)` (client-side half).
pub fn decode_signal(bytes: &[u8]) -> Result<(Value, Value)> {
    let frame: SignalFrame =
        rmp_serde::from_slice(bytes).map_err(|e| WireError::malformed("signal", e))?;
    let inner: SignalInner =
        rmp_serde::from_slice(&frame.data).map_err(|e| WireError::malformed("signal body", e))?;
    let (cell_id, payload_bytes) = inner.app;
    let payload = rmp_serde::from_slice(&payload_bytes)
        .map_err(|e| WireError::malformed("signal payload", e))?;
    Ok((cell_id, payload))
}
