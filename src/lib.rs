// src/lib.rs
//
// Service registration and discovery against a Consul-compatible registry.

pub mod backend;
pub mod client;
pub mod config;
pub mod consul_http;
pub mod error;
pub mod health_endpoint;
pub mod memory_registry;
pub mod service;
pub mod tags;

pub use backend::RegistryBackend;
pub use client::RegistryClient;
pub use config::RegistryConfig;
pub use consul_http::ConsulHttp;
pub use error::{RegistryError, TransportError};
pub use memory_registry::{HealthStatus, MemoryRegistry};
pub use service::{HealthCheckSpec, QueryMeta, ServiceInstance, ServiceRegistration};
pub use tags::{TagPolicy, TraefikTags};
