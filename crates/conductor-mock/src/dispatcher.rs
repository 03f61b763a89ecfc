//! Glue between the transport and the registry.
//!
//! One inbound frame in, exactly one reply frame out: a resolution miss
//! becomes an `error`-tagged reply rather than a dropped connection.

use conductor_wire::{Value, WireError, codec, tags};
use tracing::{debug, warn};

use crate::registry::ResponseRegistry;

/// Turn one inbound frame into the reply to write back on the same
/// connection.
///
/// Fails only when the outer envelope is malformed (there is no
/// correlation id to answer with) or the reply cannot be encoded; the
/// caller treats either as a connection-level protocol error.
pub(crate) fn dispatch(bytes: &[u8], registry: &ResponseRegistry) -> Result<Vec<u8>, WireError> {
    let envelope = codec::decode_envelope(bytes)?;

    let request = match codec::decode_request(&envelope.data) {
        Ok(request) => request,
        Err(e) => {
            // The envelope id is known, so the frame can still be
            // answered instead of silently dropped.
            warn!(error = %e, "inbound request bytes did not decode");
            return codec::encode_response(tags::ERROR, "", envelope.id, Value::from(e.to_string()));
        }
    };

    debug!(tag = %request.tag, "dispatching request");

    let (reply_tag, payload) = match registry.resolve(&request.tag, &request.data) {
        Ok(response) => {
            let payload = response.realize(&request);
            if response.is_error() {
                (tags::ERROR, payload)
            } else {
                (request.tag.as_str(), payload)
            }
        }
        Err(e) => {
            warn!(tag = %request.tag, error = %e, "no registered response");
            (tags::ERROR, Value::from(e.to_string()))
        }
    };

    codec::encode_response(reply_tag, &request.tag, envelope.id, payload)
}
