// src/backend.rs
//
// The only capability the client needs from a registry. Swap the
// implementation to change transport or to run without an agent.

use crate::error::TransportError;
use crate::service::{AgentServiceRegistration, QueryMeta, ServiceEntry};
use async_trait::async_trait;

#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Create or overwrite the agent record for `reg.id`.
    async fn register_service(&self, reg: &AgentServiceRegistration) -> Result<(), TransportError>;

    /// Remove the record and its check. Unknown ids follow registry semantics.
    async fn deregister_service(&self, id: &str) -> Result<(), TransportError>;

    /// Health-filtered lookup by name and optional tag.
    async fn health_service(
        &self,
        service: &str,
        tag: Option<&str>,
        passing_only: bool,
    ) -> Result<(Vec<ServiceEntry>, QueryMeta), TransportError>;
}
