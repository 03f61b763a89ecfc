//! The mock conductor: listeners, response registration, and signal
//! broadcast under one handle.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::info;

use conductor_wire::codec::encode_signal;
use conductor_wire::types::Value;

use crate::config::ConductorConfig;
use crate::error::{ConductorError, Result};
use crate::interface::Interface;
use crate::registry::ResponseRegistry;
use crate::response::MockResponse;

/// A programmable stand-in for a conductor process.
///
/// Binds an optional admin listener and any number of app listeners,
/// answers every request from the registered responses, and fans
/// signals out to all connected app clients. All methods take `&self`;
/// the handle is cheap to share across tasks behind an `Arc`.
pub struct MockConductor {
    config: ConductorConfig,
    registry: Arc<ResponseRegistry>,
    admin: Mutex<Option<Interface>>,
    apps: Mutex<Vec<Interface>>,
}

impl MockConductor {
    /// Bind every listener named by `config` and start serving.
    ///
    /// Ports set to `0` are auto-assigned; read the result back with
    /// [`MockConductor::admin_port`] and [`MockConductor::app_ports`].
    ///
    /// # Errors
    ///
    /// Returns an error if any listener fails to bind. Listeners bound
    /// before the failure are shut down before this returns.
    pub async fn bind(config: ConductorConfig) -> Result<Self> {
        let registry = Arc::new(ResponseRegistry::new());

        let conductor = Self {
            config,
            registry,
            admin: Mutex::new(None),
            apps: Mutex::new(Vec::new()),
        };

        if let Some(port) = conductor.config.admin_port {
            let admin = match conductor.bind_interface(port, "admin").await {
                Ok(admin) => admin,
                Err(e) => {
                    conductor.close().await;
                    return Err(e);
                }
            };
            *conductor.admin.lock().await = Some(admin);
        }
        for port in conductor.config.app_ports.clone() {
            if let Err(e) = conductor.add_port(port).await {
                conductor.close().await;
                return Err(e);
            }
        }

        info!(
            admin = ?conductor.admin_port().await,
            apps = ?conductor.app_ports().await,
            "mock conductor up"
        );
        Ok(conductor)
    }

    async fn bind_interface(&self, port: u16, label: &'static str) -> Result<Interface> {
        Interface::bind(
            &self.config.host,
            port,
            self.registry.clone(),
            self.config.channel_capacity,
            self.config.max_message_size,
            label,
        )
        .await
    }

    /// Bind one more app listener, returning the actual port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound.
    pub async fn add_port(&self, port: u16) -> Result<u16> {
        let interface = self.bind_interface(port, "app").await?;
        let port = interface.port();
        self.apps.lock().await.push(interface);
        Ok(port)
    }

    /// The bound admin port, if an admin listener was configured.
    pub async fn admin_port(&self) -> Option<u16> {
        self.admin.lock().await.as_ref().map(Interface::port)
    }

    /// The bound app ports, in the order their listeners were added.
    pub async fn app_ports(&self) -> Vec<u16> {
        self.apps.lock().await.iter().map(Interface::port).collect()
    }

    /// Register the catch-all response, replacing any previous one.
    pub fn register_any(&self, response: MockResponse) {
        self.registry.register_any(response);
    }

    /// Queue a response for the next request of any type.
    pub fn register_next(&self, response: MockResponse) {
        self.registry.register_next(response);
    }

    /// Queue a single-use response for requests matching `tag` and
    /// `data` (volatile fields ignored).
    ///
    /// # Errors
    ///
    /// Returns [`ConductorError::UnknownRequestType`] if `tag` is not a
    /// recognized request type.
    pub fn register_once(&self, tag: &str, data: &Value, response: MockResponse) -> Result<()> {
        self.registry.register_once(tag, data, response)
    }

    /// Drop every registered response, in all three tiers.
    pub fn clear_responses(&self) {
        self.registry.clear();
    }

    /// Encode a `Signal` frame for `cell_id` and `payload` and push it
    /// to every connected app client. Admin connections never receive
    /// signals.
    ///
    /// # Errors
    ///
    /// Returns [`ConductorError::NoAppInterfaces`] if no app client is
    /// connected, so a test that forgot to attach a receiver fails
    /// loudly instead of passing on a dropped signal.
    pub async fn broadcast_app_signal(&self, cell_id: Value, payload: Value) -> Result<()> {
        let apps = self.apps.lock().await;
        let connected: usize = apps.iter().map(|i| i.connections().count()).sum();
        if connected == 0 {
            return Err(ConductorError::NoAppInterfaces);
        }
        let frame = encode_signal(cell_id, payload)?;
        let message = Message::binary(frame);
        join_all(apps.iter().map(|i| i.connections().broadcast(&message))).await;
        Ok(())
    }

    /// Shut down the app listeners only, releasing their ports. The
    /// admin listener and all registered responses stay in place.
    pub async fn close_apps(&self) {
        let apps: Vec<Interface> = self.apps.lock().await.drain(..).collect();
        join_all(apps.into_iter().map(Interface::close)).await;
    }

    /// Shut down every listener and release every bound port. Admin and
    /// app interfaces close concurrently, in no particular order.
    pub async fn close(&self) {
        let mut interfaces: Vec<Interface> = self.apps.lock().await.drain(..).collect();
        if let Some(admin) = self.admin.lock().await.take() {
            interfaces.push(admin);
        }
        join_all(interfaces.into_iter().map(Interface::close)).await;
        info!("mock conductor closed");
    }
}
