// src/memory_registry.rs
use crate::backend::RegistryBackend;
use crate::error::TransportError;
use crate::service::{AgentService, AgentServiceRegistration, NodeEntry, QueryMeta, ServiceEntry};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::time::{Duration, Instant};

/// Check state as the registry would report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Passing,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
struct Record {
    registration: AgentServiceRegistration,
    status: HealthStatus,
}

#[derive(Debug, Default)]
struct State {
    // registration order is the order lookups return
    records: Vec<Record>,
    index: u64,
    unavailable: Option<String>,
}

/// In-process registry with interior mutability. Stands in for an agent
/// in tests and local runs; nothing polls the checks, so status is set by
/// hand and new registrations start out passing.
#[derive(Debug)]
pub struct MemoryRegistry {
    node: String,
    state: RwLock<State>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    pub fn new() -> Self {
        MemoryRegistry {
            node: "local".to_string(),
            state: RwLock::new(State::default()),
        }
    }

    /// Set the check status for `id`. Returns false if no such instance.
    pub fn set_health(&self, id: &str, status: HealthStatus) -> bool {
        let mut state = self.state.write();
        let found = match state.records.iter_mut().find(|r| r.registration.id == id) {
            Some(record) => {
                record.status = status;
                true
            }
            None => false,
        };
        if found {
            state.index += 1;
        }
        found
    }

    /// Make every call fail as if the agent could not be reached.
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        self.state.write().unavailable = Some(reason.into());
    }

    pub fn set_available(&self) {
        self.state.write().unavailable = None;
    }

    /// Registrations as last written, in registration order.
    pub fn registrations(&self) -> Vec<AgentServiceRegistration> {
        self.state.read().records.iter().map(|r| r.registration.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<AgentServiceRegistration> {
        self.state
            .read()
            .records
            .iter()
            .find(|r| r.registration.id == id)
            .map(|r| r.registration.clone())
    }

    fn check_available(state: &State) -> Result<(), TransportError> {
        match &state.unavailable {
            Some(reason) => Err(TransportError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn register_service(&self, reg: &AgentServiceRegistration) -> Result<(), TransportError> {
        let mut state = self.state.write();
        Self::check_available(&state)?;
        let record = Record { registration: reg.clone(), status: HealthStatus::Passing };
        match state.records.iter().position(|r| r.registration.id == reg.id) {
            Some(i) => state.records[i] = record,
            None => state.records.push(record),
        }
        state.index += 1;
        Ok(())
    }

    async fn deregister_service(&self, id: &str) -> Result<(), TransportError> {
        let mut state = self.state.write();
        Self::check_available(&state)?;
        let before = state.records.len();
        state.records.retain(|r| r.registration.id != id);
        if state.records.len() != before {
            state.index += 1;
        }
        Ok(())
    }

    async fn health_service(
        &self,
        service: &str,
        tag: Option<&str>,
        passing_only: bool,
    ) -> Result<(Vec<ServiceEntry>, QueryMeta), TransportError> {
        let started = Instant::now();
        let state = self.state.read();
        Self::check_available(&state)?;

        let entries = state
            .records
            .iter()
            .filter(|r| r.registration.name == service)
            .filter(|r| tag.map_or(true, |t| r.registration.tags.iter().any(|have| have == t)))
            .filter(|r| !passing_only || r.status == HealthStatus::Passing)
            .map(|r| ServiceEntry {
                node: NodeEntry { node: self.node.clone(), address: "127.0.0.1".to_string() },
                service: AgentService {
                    id: r.registration.id.clone(),
                    service: r.registration.name.clone(),
                    tags: Some(r.registration.tags.clone()),
                    address: r.registration.address.clone(),
                    port: r.registration.port,
                },
            })
            .collect();

        let meta = QueryMeta {
            last_index: state.index,
            known_leader: true,
            last_contact: Duration::ZERO,
            request_time: started.elapsed(),
        };
        Ok((entries, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{HealthCheckSpec, ServiceRegistration};

    fn agent_reg(id: &str, name: &str, port: u16, tags: &[&str]) -> AgentServiceRegistration {
        let reg = ServiceRegistration::new(id, name, "10.0.0.1", port, "http://10.0.0.1/health");
        AgentServiceRegistration {
            id: reg.id.clone(),
            name: reg.name.clone(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            port: reg.port,
            address: reg.host.clone(),
            check: HealthCheckSpec::for_registration(&reg),
        }
    }

    #[tokio::test]
    async fn reregistering_replaces_in_place() {
        let registry = MemoryRegistry::new();
        registry.register_service(&agent_reg("a-1", "a", 1, &[])).await.unwrap();
        registry.register_service(&agent_reg("a-2", "a", 2, &[])).await.unwrap();
        registry.register_service(&agent_reg("a-1", "a", 11, &[])).await.unwrap();

        let ports: Vec<u16> = registry.registrations().iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![11, 2]);
    }

    #[tokio::test]
    async fn health_query_filters_status_and_tag() {
        let registry = MemoryRegistry::new();
        registry.register_service(&agent_reg("a-1", "a", 1, &["blue"])).await.unwrap();
        registry.register_service(&agent_reg("a-2", "a", 2, &["green"])).await.unwrap();
        registry.register_service(&agent_reg("b-1", "b", 3, &["blue"])).await.unwrap();
        assert!(registry.set_health("a-2", HealthStatus::Critical));
        assert!(!registry.set_health("zzz", HealthStatus::Critical));

        let (passing, _) = registry.health_service("a", None, true).await.unwrap();
        assert_eq!(passing.len(), 1);
        assert_eq!(passing[0].service.id, "a-1");

        let (all, _) = registry.health_service("a", None, false).await.unwrap();
        assert_eq!(all.len(), 2);

        let (green, _) = registry.health_service("a", Some("green"), false).await.unwrap();
        assert_eq!(green.len(), 1);
        assert_eq!(green[0].service.port, 2);
    }

    #[tokio::test]
    async fn index_advances_on_writes_only() {
        let registry = MemoryRegistry::new();
        registry.register_service(&agent_reg("a-1", "a", 1, &[])).await.unwrap();
        let (_, first) = registry.health_service("a", None, true).await.unwrap();
        registry.deregister_service("missing").await.unwrap();
        let (_, second) = registry.health_service("a", None, true).await.unwrap();
        assert_eq!(first.last_index, second.last_index);

        registry.deregister_service("a-1").await.unwrap();
        let (entries, third) = registry.health_service("a", None, true).await.unwrap();
        assert!(entries.is_empty());
        assert!(third.last_index > second.last_index);
    }

    #[tokio::test]
    async fn unavailable_registry_fails_every_call() {
        let registry = MemoryRegistry::new();
        registry.set_unavailable("agent down");
        let err = registry.health_service("a", None, true).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(ref r) if r == "agent down"));
        assert!(registry.deregister_service("a-1").await.is_err());

        registry.set_available();
        assert!(registry.register_service(&agent_reg("a-1", "a", 1, &[])).await.is_ok());
    }
}
