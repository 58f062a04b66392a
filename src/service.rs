// src/service.rs
//
// Caller-facing model plus the agent/health wire shapes exchanged with the registry.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll interval configured into every health check.
pub const CHECK_INTERVAL: &str = "10s";
/// Per-poll timeout configured into every health check.
pub const CHECK_TIMEOUT: &str = "1s";
pub const CHECK_METHOD: &str = "GET";
pub const CHECK_NAME: &str = "HTTP API health";

/// A running instance to announce to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRegistration {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub health_check_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServiceRegistration {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        health_check_url: impl Into<String>,
    ) -> Self {
        ServiceRegistration {
            id: id.into(),
            name: name.into(),
            host: host.into(),
            port,
            health_check_url: health_check_url.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// HTTP check attached to a registration. Only the URL and id vary; the
/// rest are fixed policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "HTTP")]
    pub http: String,
    #[serde(rename = "TLSSkipVerify")]
    pub tls_skip_verify: bool,
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Interval")]
    pub interval: String,
    #[serde(rename = "Timeout")]
    pub timeout: String,
}

impl HealthCheckSpec {
    pub fn for_registration(reg: &ServiceRegistration) -> Self {
        HealthCheckSpec {
            check_id: reg.id.clone(),
            name: CHECK_NAME.to_string(),
            http: reg.health_check_url.clone(),
            tls_skip_verify: true,
            method: CHECK_METHOD.to_string(),
            interval: CHECK_INTERVAL.to_string(),
            timeout: CHECK_TIMEOUT.to_string(),
        }
    }
}

/// Body of `PUT /v1/agent/service/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentServiceRegistration {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Tags")]
    pub tags: Vec<String>,
    #[serde(rename = "Port")]
    pub port: u16,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Check")]
    pub check: HealthCheckSpec,
}

/// One element of the `/v1/health/service/{name}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(rename = "Node")]
    pub node: NodeEntry,
    #[serde(rename = "Service")]
    pub service: AgentService,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    #[serde(rename = "Node", default)]
    pub node: String,
    #[serde(rename = "Address", default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Tags", default)]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "Port")]
    pub port: u16,
}

/// A passing instance returned by resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub id: String,
    pub name: String,
    pub address: String,
    pub port: u16,
    pub tags: Vec<String>,
}

impl ServiceInstance {
    /// `http://{address}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

impl From<ServiceEntry> for ServiceInstance {
    fn from(entry: ServiceEntry) -> Self {
        // Consul leaves the service address empty when it equals the node's.
        let address = if entry.service.address.is_empty() {
            entry.node.address
        } else {
            entry.service.address
        };
        ServiceInstance {
            id: entry.service.id,
            name: entry.service.service,
            address,
            port: entry.service.port,
            tags: entry.service.tags.unwrap_or_default(),
        }
    }
}

/// Bookkeeping returned alongside a query. Passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMeta {
    pub last_index: u64,
    pub known_leader: bool,
    pub last_contact: Duration,
    pub request_time: Duration,
}
