// src/consul_http.rs
//
// Consul agent HTTP API transport.

use crate::backend::RegistryBackend;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, TransportError};
use crate::service::{AgentServiceRegistration, QueryMeta, ServiceEntry};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, RequestBuilder, Response, Url};
use std::time::{Duration, Instant};

const TOKEN_HEADER: &str = "X-Consul-Token";
const INDEX_HEADER: &str = "X-Consul-Index";
const KNOWN_LEADER_HEADER: &str = "X-Consul-KnownLeader";
const LAST_CONTACT_HEADER: &str = "X-Consul-LastContact";

/// Talks to one Consul agent. Holds no state beyond the immutable handle,
/// so clones are cheap and can be shared across tasks.
#[derive(Debug, Clone)]
pub struct ConsulHttp {
    base: Url,
    client: Client,
    token: Option<String>,
    datacenter: Option<String>,
}

impl ConsulHttp {
    /// Prepare a handle. Nothing is sent until the first call.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let connection_err = |reason: String| RegistryError::Connection {
            address: config.address.clone(),
            reason,
        };
        let base = parse_address(&config.address).map_err(connection_err)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| connection_err(e.to_string()))?;

        Ok(ConsulHttp {
            base,
            client,
            token: config.token.clone(),
            datacenter: config.datacenter.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Attach token and datacenter to every request.
    fn decorate(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token);
        }
        if let Some(dc) = &self.datacenter {
            req = req.query(&[("dc", dc)]);
        }
        req
    }
}

/// Accepts `host:port` or a full `http(s)://` URL.
fn parse_address(address: &str) -> Result<Url, String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err("address is empty".to_string());
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let url = Url::parse(&with_scheme).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{}'", other)),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("address has no host".to_string());
    }
    Ok(url)
}

async fn expect_success(resp: Response) -> Result<Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(TransportError::Status { status: status.as_u16(), body })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn query_meta(headers: &HeaderMap, request_time: Duration) -> QueryMeta {
    QueryMeta {
        last_index: header(headers, INDEX_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        known_leader: header(headers, KNOWN_LEADER_HEADER) == Some("true"),
        last_contact: header(headers, LAST_CONTACT_HEADER)
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or_default(),
        request_time,
    }
}

#[async_trait]
impl RegistryBackend for ConsulHttp {
    async fn register_service(&self, reg: &AgentServiceRegistration) -> Result<(), TransportError> {
        let url = self.endpoint(&["v1", "agent", "service", "register"]);
        let resp = self.decorate(self.client.put(url)).json(reg).send().await?;
        expect_success(resp).await?;
        log::debug!("registered service instance {} ({})", reg.id, reg.name);
        Ok(())
    }

    async fn deregister_service(&self, id: &str) -> Result<(), TransportError> {
        let url = self.endpoint(&["v1", "agent", "service", "deregister", id]);
        let resp = self.decorate(self.client.put(url)).send().await?;
        expect_success(resp).await?;
        log::debug!("deregistered service instance {}", id);
        Ok(())
    }

    async fn health_service(
        &self,
        service: &str,
        tag: Option<&str>,
        passing_only: bool,
    ) -> Result<(Vec<ServiceEntry>, QueryMeta), TransportError> {
        let url = self.endpoint(&["v1", "health", "service", service]);
        let mut req = self.decorate(self.client.get(url));
        if passing_only {
            req = req.query(&[("passing", "1")]);
        }
        if let Some(tag) = tag {
            req = req.query(&[("tag", tag)]);
        }

        let started = Instant::now();
        let resp = expect_success(req.send().await?).await?;
        let meta = query_meta(resp.headers(), started.elapsed());
        let body = resp.bytes().await?;
        let entries: Option<Vec<ServiceEntry>> =
            serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        let entries = entries.unwrap_or_default();

        log::debug!(
            "health query for {} returned {} entries at index {}",
            service,
            entries.len(),
            meta.last_index
        );
        Ok((entries, meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn handle(address: &str) -> Result<ConsulHttp, RegistryError> {
        ConsulHttp::new(&RegistryConfig::new(address))
    }

    #[test]
    fn bare_host_port_gets_http_scheme() {
        let consul = handle("127.0.0.1:8500").unwrap();
        assert_eq!(consul.base_url().as_str(), "http://127.0.0.1:8500/");
    }

    #[test]
    fn malformed_addresses_are_connection_errors() {
        for bad in ["", "   ", "ftp://consul:21", "http://", "consul host:85x00"] {
            match handle(bad) {
                Err(RegistryError::Connection { address, .. }) => assert_eq!(address, bad),
                other => panic!("expected connection error for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn endpoint_keeps_base_path_and_escapes_ids() {
        let consul = handle("https://gateway.local/consul").unwrap();
        let url = consul.endpoint(&["v1", "agent", "service", "deregister", "web/1"]);
        assert_eq!(
            url.as_str(),
            "https://gateway.local/consul/v1/agent/service/deregister/web%2F1"
        );
    }

    #[test]
    fn query_meta_reads_consul_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(INDEX_HEADER, HeaderValue::from_static("4242"));
        headers.insert(KNOWN_LEADER_HEADER, HeaderValue::from_static("true"));
        headers.insert(LAST_CONTACT_HEADER, HeaderValue::from_static("15"));
        let meta = query_meta(&headers, Duration::from_millis(3));
        assert_eq!(meta.last_index, 4242);
        assert!(meta.known_leader);
        assert_eq!(meta.last_contact, Duration::from_millis(15));
        assert_eq!(meta.request_time, Duration::from_millis(3));
    }

    #[test]
    fn query_meta_defaults_when_headers_missing() {
        let meta = query_meta(&HeaderMap::new(), Duration::ZERO);
        assert_eq!(meta, QueryMeta::default());
    }
}
