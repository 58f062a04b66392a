use serde::Deserialize;
use std::{fs::File, io::{BufReader, Read}, path::Path, time::Duration};
use thiserror::Error;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open config file '{path}' : {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// How to reach the registry agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            address: default_address(),
            token: None,
            datacenter: None,
            request_timeout_secs: None,
        }
    }
}

impl RegistryConfig {
    pub fn new(address: impl Into<String>) -> Self {
        RegistryConfig { address: address.into(), ..Default::default() }
    }

    /// Overlay the standard `CONSUL_HTTP_ADDR`, `CONSUL_HTTP_TOKEN` and
    /// `CONSUL_DATACENTER` variables.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_vars(|key| std::env::var(key).ok());
        self
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(addr) = set("CONSUL_HTTP_ADDR") {
            self.address = addr;
        }
        if let Some(token) = set("CONSUL_HTTP_TOKEN") {
            self.token = Some(token);
        }
        if let Some(dc) = set("CONSUL_DATACENTER") {
            self.datacenter = Some(dc);
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// The instance the agent binary announces.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl ServiceConfig {
    /// Empty means the default path; a missing leading `/` is added.
    fn normalize_health_path(&mut self) {
        let trimmed = self.health_path.trim();
        self.health_path = if trimmed.is_empty() {
            default_health_path()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
    }

    pub fn health_check_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.health_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    pub service: ServiceConfig,
}

impl AgentConfig {
    /// Load and parse configuration from the given YAML file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let p = path.as_ref();
        let file = File::open(p)
            .map_err(|e| ConfigError::Io { path: p.display().to_string(), source: e })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut cfg: AgentConfig = serde_yaml::from_reader(reader)?;
        cfg.service.normalize_health_path();
        Ok(cfg)
    }
}
