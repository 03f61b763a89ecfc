//! Wire-level error type.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors raised while encoding or decoding conductor frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// Inbound bytes did not decode as the expected frame shape.
    #[error("malformed {context} frame: {source}")]
    MalformedFrame {
        /// Which frame layer failed to decode.
        context: &'static str,
        /// Underlying msgpack decode failure.
        #[source]
        source: rmp_serde::decode::Error,
    },

    /// A frame could not be encoded (registered value not representable).
    #[error("failed to encode {context} frame: {source}")]
    Encode {
        /// Which frame layer failed to encode.
        context: &'static str,
        /// Underlying msgpack encode failure.
        #[source]
        source: rmp_serde::encode::Error,
    },
}

impl WireError {
    pub(crate) fn malformed(context: &'static str, source: rmp_serde::decode::Error) -> Self {
        Self::MalformedFrame { context, source }
    }

    pub(crate) fn encode(context: &'static str, source: rmp_serde::encode::Error) -> Self {
        Self::Encode { context, source }
    }
}
