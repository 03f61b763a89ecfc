//! Registered response entries.

use std::fmt;
use std::sync::Arc;

use conductor_wire::{Request, Value};

/// Signature of a computed responder.
pub type ComputeFn = dyn Fn(&Request) -> Value + Send + Sync;

/// How a registered response produces its value.
///
/// An explicit tagged variant instead of runtime "is this a function"
/// probing: a `Compute` responder is invoked once per resolution with the
/// just-decoded request.
#[derive(Clone)]
pub enum Responder {
    /// A fixed value returned as registered.
    Value(Value),
    /// A function of the incoming request, evaluated at dispatch time.
    Compute(Arc<ComputeFn>),
}

/// A single registered response: a responder plus whether the reply goes
/// out under the `error` tag.
#[derive(Clone)]
pub struct MockResponse {
    pub(crate) is_error: bool,
    pub(crate) responder: Responder,
}

impl MockResponse {
    /// A successful response with a fixed value.
    pub fn ok(value: Value) -> Self {
        Self {
            is_error: false,
            responder: Responder::Value(value),
        }
    }

    /// An error response; the value becomes the `error`-tagged payload.
    pub fn error(value: Value) -> Self {
        Self {
            is_error: true,
            responder: Responder::Value(value),
        }
    }

    /// A successful response computed from the incoming request.
    pub fn compute(f: impl Fn(&Request) -> Value + Send + Sync + 'static) -> Self {
        Self {
            is_error: false,
            responder: Responder::Compute(Arc::new(f)),
        }
    }

    /// An error response computed from the incoming request.
    pub fn compute_error(f: impl Fn(&Request) -> Value + Send + Sync + 'static) -> Self {
        Self {
            is_error: true,
            responder: Responder::Compute(Arc::new(f)),
        }
    }

    /// Whether this entry replies under the `error` tag.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Produce the concrete payload for `request`.
    pub(crate) fn realize(&self, request: &Request) -> Value {
        match &self.responder {
            Responder::Value(v) => v.clone(),
            Responder::Compute(f) => f(request),
        }
    }
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let responder: &dyn fmt::Debug = match &self.responder {
            Responder::Value(v) => v,
            Responder::Compute(_) => &"<compute fn>",
        };
        f.debug_struct("MockResponse")
            .field("is_error", &self.is_error)
            .field("responder", responder)
            .finish()
    }
}
