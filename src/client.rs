// src/client.rs
use crate::backend::RegistryBackend;
use crate::config::RegistryConfig;
use crate::consul_http::ConsulHttp;
use crate::error::RegistryError;
use crate::service::{
    AgentServiceRegistration, HealthCheckSpec, QueryMeta, ServiceInstance, ServiceRegistration,
};
use crate::tags::{augment, TagPolicy, TraefikTags};
use std::{fmt, sync::Arc};

/// Registration and resolution against one registry endpoint.
///
/// Every call is a fresh round-trip; nothing is cached, retried or logged
/// on failure. Clones share the same handle.
pub struct RegistryClient<B = ConsulHttp> {
    backend: Arc<B>,
    tag_policy: Arc<dyn TagPolicy>,
}

impl<B> Clone for RegistryClient<B> {
    fn clone(&self) -> Self {
        RegistryClient {
            backend: self.backend.clone(),
            tag_policy: self.tag_policy.clone(),
        }
    }
}

impl<B: fmt::Debug> fmt::Debug for RegistryClient<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryClient").field("backend", &self.backend).finish_non_exhaustive()
    }
}

impl RegistryClient<ConsulHttp> {
    /// Bind to the agent at `address` (`host:port` or a URL). Does not
    /// contact the agent.
    pub fn new(address: &str) -> Result<Self, RegistryError> {
        Self::with_config(&RegistryConfig::new(address))
    }

    pub fn with_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
        Ok(Self::with_backend(ConsulHttp::new(config)?))
    }
}

impl<B: RegistryBackend> RegistryClient<B> {
    pub fn with_backend(backend: B) -> Self {
        Self::from_shared(Arc::new(backend))
    }

    pub fn from_shared(backend: Arc<B>) -> Self {
        RegistryClient {
            backend,
            tag_policy: Arc::new(TraefikTags),
        }
    }

    /// Replace the convention tags appended on register.
    pub fn with_tag_policy(mut self, policy: impl TagPolicy + 'static) -> Self {
        self.tag_policy = Arc::new(policy);
        self
    }

    /// The agent payload `register` sends for `reg`.
    pub fn agent_registration(&self, reg: &ServiceRegistration) -> AgentServiceRegistration {
        AgentServiceRegistration {
            id: reg.id.clone(),
            name: reg.name.clone(),
            tags: augment(&reg.tags, self.tag_policy.as_ref(), &reg.name),
            port: reg.port,
            address: reg.host.clone(),
            check: HealthCheckSpec::for_registration(reg),
        }
    }

    /// Create or overwrite the registry record for `reg.id`.
    pub async fn register(&self, reg: &ServiceRegistration) -> Result<(), RegistryError> {
        let payload = self.agent_registration(reg);
        self.backend
            .register_service(&payload)
            .await
            .map_err(|source| RegistryError::Registration { id: reg.id.clone(), source })
    }

    pub async fn deregister(&self, id: &str) -> Result<(), RegistryError> {
        self.backend
            .deregister_service(id)
            .await
            .map_err(|source| RegistryError::Deregistration { id: id.to_string(), source })
    }

    /// Passing instances of `service_name`, optionally filtered by `tag`
    /// (empty means no filter). Zero instances is `NotFound`.
    pub async fn resolve_instances(
        &self,
        service_name: &str,
        tag: &str,
    ) -> Result<(Vec<ServiceInstance>, QueryMeta), RegistryError> {
        let tag = (!tag.is_empty()).then_some(tag);
        let (entries, meta) = self
            .backend
            .health_service(service_name, tag, true)
            .await
            .map_err(|source| RegistryError::Query { service: service_name.to_string(), source })?;

        if entries.is_empty() {
            return Err(RegistryError::NotFound(service_name.to_string()));
        }
        let instances = entries.into_iter().map(ServiceInstance::from).collect();
        Ok((instances, meta))
    }

    /// `http://{address}:{port}` of the first instance in registry order.
    pub async fn resolve_base_url(&self, service_name: &str) -> Result<String, RegistryError> {
        let (instances, _) = self.resolve_instances(service_name, "").await?;
        instances
            .first()
            .map(ServiceInstance::base_url)
            .ok_or_else(|| RegistryError::NotFound(service_name.to_string()))
    }
}
