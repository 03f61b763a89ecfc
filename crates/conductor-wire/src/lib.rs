//! # conductor-wire
//!
//! Wire types and MessagePack codec for the mock Holochain conductor.
//!
//! The conductor protocol frames every request in a map-shaped msgpack
//! envelope carrying a correlation id and opaque inner bytes:
//!
//! - **Envelope**: `{id, data: bytes}` where the bytes decode to a
//!   [`Request`] (`{type, data}`)
//! - **Response**: `{type: "Response", id, data: bytes({type, data})}`
//! - **Signal**: `{type: "Signal", data: bytes({App: [cell_id, bytes]})}`
//!
//! Zome-call responses carry one extra encoding layer: their payload bytes
//! are themselves a msgpack-encoded value ([`codec::encode_response`]).
//!
//! ## Crate Position
//!
//! Leaf crate. Depended on by `conductor-mock`.

#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod tags;
pub mod types;

pub use error::WireError;
pub use types::{Envelope, Request, Value};
