//! Conductor configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::MockConductor`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConductorConfig {
    /// Host to bind every listener on (default `"127.0.0.1"`).
    pub host: String,
    /// Admin interface port; `None` binds no admin listener. `Some(0)`
    /// auto-assigns.
    pub admin_port: Option<u16>,
    /// App interface ports to bind at startup; more can be added later
    /// via `add_port`.
    pub app_ports: Vec<u16>,
    /// Per-connection outbound channel capacity (frames buffered between
    /// the dispatcher and the socket writer).
    pub channel_capacity: usize,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            admin_port: None,
            app_ports: Vec::new(),
            channel_capacity: 32,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl ConductorConfig {
    /// Config with one auto-assigned admin port.
    pub fn with_admin() -> Self {
        Self {
            admin_port: Some(0),
            ..Self::default()
        }
    }

    /// Config with `n` auto-assigned app ports.
    pub fn with_app_ports(n: usize) -> Self {
        Self {
            app_ports: vec![0; n],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host() {
        let cfg = ConductorConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
    }

    #[test]
    fn default_binds_no_listeners() {
        let cfg = ConductorConfig::default();
        assert!(cfg.admin_port.is_none());
        assert!(cfg.app_ports.is_empty());
    }

    #[test]
    fn default_channel_capacity() {
        let cfg = ConductorConfig::default();
        assert_eq!(cfg.channel_capacity, 32);
    }

    #[test]
    fn default_max_message_size() {
        let cfg = ConductorConfig::default();
        assert_eq!(cfg.max_message_size, 16 * 1024 * 1024);
    }

    #[test]
    fn with_admin_auto_assigns() {
        let cfg = ConductorConfig::with_admin();
        assert_eq!(cfg.admin_port, Some(0));
        assert!(cfg.app_ports.is_empty());
    }

    #[test]
    fn with_app_ports_auto_assigns() {
        let cfg = ConductorConfig::with_app_ports(3);
        assert_eq!(cfg.app_ports, vec![0, 0, 0]);
        assert!(cfg.admin_port.is_none());
    }

    #[test]
    fn serde_round_trip() {
        let cfg = ConductorConfig {
            host: "0.0.0.0".into(),
            admin_port: Some(4444),
            app_ports: vec![8888, 9999],
            channel_capacity: 8,
            max_message_size: 1024,
        };
        let bytes = rmp_serde::to_vec_named(&cfg).unwrap();
        let back: ConductorConfig = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.admin_port, cfg.admin_port);
        assert_eq!(back.app_ports, cfg.app_ports);
        assert_eq!(back.channel_capacity, cfg.channel_capacity);
        assert_eq!(back.max_message_size, cfg.max_message_size);
    }
}
