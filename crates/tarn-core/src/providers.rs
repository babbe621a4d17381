//! Capability Traits
//!
//! Interfaces the activation engine requires from the embedding
//! application: persisting materialized configuration and issued keys into
//! the local network-stack store, driving the tunnel, and surfacing
//! best-effort notifications.
//!
//! Re-authentication is deliberately NOT a capability here: the engine
//! reports [`AuthRequired`](crate::ActivationResult::AuthRequired) and the
//! caller owns the interactive flow; its contract is "token refreshed or
//! the attempt abandoned".

use crate::meta::{Pem, ServerMeta};
use crate::ovpn::OvpnConfig;
use async_trait::async_trait;

/// Capability failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum CapabilityError {
    #[error("Config store failure: {0}")]
    Store(String),

    #[error("Tunnel failure: {0}")]
    Tunnel(String),

    #[error("Notification failure: {0}")]
    Notify(String),
}

/// Persists activation results into the local network-stack configuration.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Merge the materialized profile configuration into the local VPN
    /// profile identified by `meta.uuid`.
    async fn update_config(
        &self,
        meta: &ServerMeta,
        config: &OvpnConfig,
    ) -> Result<(), CapabilityError>;

    /// Persist a freshly issued certificate/key pair.
    async fn update_keys(
        &self,
        uuid: &str,
        cert: &Pem,
        key: &Pem,
    ) -> Result<(), CapabilityError>;
}

/// Opaque tunnel lifecycle control.
#[async_trait]
pub trait TunnelController: Send + Sync {
    async fn connect(&self, uuid: &str) -> Result<(), CapabilityError>;

    async fn disconnect(&self, uuid: &str) -> Result<(), CapabilityError>;
}

/// Best-effort user notification. Failures are logged by the engine and
/// never abort an activation.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str) -> Result<(), CapabilityError>;
}
