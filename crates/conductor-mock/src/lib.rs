//! # conductor-mock
//!
//! A programmable stand-in for a Holochain conductor. Test code registers
//! canned (or computed) responses, points a real conductor-api client at
//! the mock's WebSocket ports, and exercises client code without a
//! backend.
//!
//! - **Registry**: three response tiers — `next` (ordered, one-shot,
//!   ignores the request) > `once` (keyed on request type + non-volatile
//!   data) > `any` (durable fallback)
//! - **Listener set**: one optional admin interface plus any number of app
//!   interfaces, added dynamically
//! - **Dispatcher**: every inbound frame gets exactly one reply, including
//!   a synthesized `error` reply when nothing matches
//! - **Signals**: unsolicited frames fanned out to every connected
//!   app-side client
//! - Graceful shutdown via `CancellationToken`; `close()` returns once
//!   every listener has released its port
//!
//! ```no_run
//! use conductor_mock::{ConductorConfig, MockConductor, MockResponse};
//! use conductor_wire::Value;
//!
//! # async fn demo() -> conductor_mock::Result<()> {
//! let conductor = MockConductor::bind(ConductorConfig::default()).await?;
//! let port = conductor.add_port(0).await?;
//! conductor.register_any(MockResponse::ok(Value::from("ready")));
//! // ... connect a client to ws://127.0.0.1:{port} ...
//! conductor.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod conductor;
pub mod config;
mod connection;
mod dispatcher;
pub mod error;
pub mod key;
pub mod registry;
pub mod response;

mod interface;

pub use conductor::MockConductor;
pub use config::ConductorConfig;
pub use error::{ConductorError, Result};
pub use registry::ResponseRegistry;
pub use response::{MockResponse, Responder};

pub use conductor_wire as wire;
