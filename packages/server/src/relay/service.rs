//! Relay entry point.

use std::sync::Arc;

use hiroba_shared::time::{Clock, SystemClock};

use crate::domain::{Connection, MemberId, RegistryError};

use super::{
    config::RelayConfig,
    mailbox::mailbox,
    member::{MemberHandle, spawn_member},
    registry::{Registry, RegistryHandle, RegistrySnapshot},
};

/// Composition root of the relay core.
///
/// Owns a handle to the registry event loop and turns accepted connections
/// into members. Cloning is cheap; every clone talks to the same registry.
///
/// # Example
///
/// ```ignore
/// let relay = Relay::start(RelayConfig::default());
/// let member = relay.accept_connection(connection).await?;
/// tracing::info!("accepted '{}'", member.id());
/// ```
#[derive(Debug, Clone)]
pub struct Relay {
    registry: RegistryHandle,
    config: RelayConfig,
}

impl Relay {
    /// Start the registry event loop with the system clock.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: RelayConfig) -> Self {
        Self::start_with_clock(config, Arc::new(SystemClock))
    }

    /// Start the registry event loop with the given clock.
    pub fn start_with_clock(config: RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = Registry::new(clock).spawn(config.command_buffer);
        Self { registry, config }
    }

    /// Admit a new member for `connection` and start its pumps.
    ///
    /// Returns as soon as the member is a broadcast target and both pumps are
    /// running; it does not wait for the connection to end.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Stopped`] if the registry is no longer
    /// running. The connection is dropped (closed) in that case.
    pub async fn accept_connection<C: Connection>(
        &self,
        connection: C,
    ) -> Result<MemberHandle, RegistryError> {
        let id = MemberId::generate();
        let (sender, receiver) = mailbox(self.config.mailbox_capacity);

        self.registry.admit(id, sender).await?;

        Ok(spawn_member(id, connection, receiver, self.registry.clone()))
    }

    /// Current membership and counters.
    pub async fn snapshot(&self) -> Result<RegistrySnapshot, RegistryError> {
        self.registry.snapshot().await
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
