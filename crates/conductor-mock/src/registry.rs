//! The response-matching engine.
//!
//! Three tiers, checked in descending priority:
//!
//! 1. **next** — an ordered queue consumed FIFO, ignoring the request
//!    entirely. The most specific control a test can exercise (exact,
//!    ordered, one-shot), so it outranks everything.
//! 2. **once** — FIFO queues keyed by [`crate::key::response_key`].
//! 3. **any** — a single repeatable fallback, never consumed.
//!
//! The registry is the only shared mutable state touched by concurrent
//! connection handlers; every operation runs under one non-async mutex
//! and contains no await point, so mutations are atomic with respect to
//! each other.

use std::collections::{HashMap, VecDeque};
use std::sync::OnceLock;

use conductor_wire::{Value, tags};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::ConductorError;
use crate::key::response_key;
use crate::response::MockResponse;

/// Key of the `next` queue (`"next:{}"`).
fn next_key() -> &'static str {
    static KEY: OnceLock<String> = OnceLock::new();
    KEY.get_or_init(|| response_key(tags::NEXT, &Value::Map(Vec::new())))
}

#[derive(Default)]
struct Tiers {
    queues: HashMap<String, VecDeque<MockResponse>>,
    any: Option<MockResponse>,
}

/// Stores registered responses and resolves exactly one per request.
#[derive(Default)]
pub struct ResponseRegistry {
    tiers: Mutex<Tiers>,
}

impl ResponseRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repeatable fallback, replacing any previous one.
    pub fn register_any(&self, response: MockResponse) {
        self.tiers.lock().any = Some(response);
    }

    /// Append to the `next` queue; served before any keyed or fallback
    /// response, regardless of what the request contains.
    pub fn register_next(&self, response: MockResponse) {
        let mut tiers = self.tiers.lock();
        tiers
            .queues
            .entry(next_key().to_owned())
            .or_default()
            .push_back(response);
    }

    /// Append a one-shot response under `key(tag, data)`.
    ///
    /// Fails with [`ConductorError::UnknownRequestType`] when `tag` is
    /// outside the recognized vocabulary.
    pub fn register_once(
        &self,
        tag: &str,
        data: &Value,
        response: MockResponse,
    ) -> Result<(), ConductorError> {
        if !tags::is_request_tag(tag) {
            return Err(ConductorError::UnknownRequestType(tag.to_owned()));
        }
        let key = response_key(tag, data);
        debug!(key, "registering once response");
        let mut tiers = self.tiers.lock();
        tiers.queues.entry(key).or_default().push_back(response);
        Ok(())
    }

    /// Drop every queue and the fallback.
    pub fn clear(&self) {
        let mut tiers = self.tiers.lock();
        tiers.queues.clear();
        tiers.any = None;
    }

    /// Resolve one response for an incoming `(tag, data)`.
    ///
    /// `next` pop, else keyed pop, else a clone of the fallback (never
    /// consumed), else [`ConductorError::NoMatchingResponse`]. Exhausted
    /// queues count as absent.
    pub fn resolve(&self, tag: &str, data: &Value) -> Result<MockResponse, ConductorError> {
        let mut tiers = self.tiers.lock();

        if let Some(response) = pop_front(&mut tiers.queues, next_key()) {
            return Ok(response);
        }

        let key = response_key(tag, data);
        if let Some(response) = pop_front(&mut tiers.queues, &key) {
            return Ok(response);
        }

        if let Some(any) = &tiers.any {
            return Ok(any.clone());
        }

        Err(ConductorError::NoMatchingResponse(key))
    }
}

fn pop_front(
    queues: &mut HashMap<String, VecDeque<MockResponse>>,
    key: &str,
) -> Option<MockResponse> {
    let queue = queues.get_mut(key)?;
    queue.pop_front()
}
