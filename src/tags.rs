// src/tags.rs
//
// Extra tags appended to every registration, after the caller's own.

/// Maps a service name to the convention tags a downstream router expects.
pub trait TagPolicy: Send + Sync {
    fn tags(&self, service_name: &str) -> Vec<String>;
}

impl<F> TagPolicy for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tags(&self, service_name: &str) -> Vec<String> {
        self(service_name)
    }
}

/// Traefik (v1) routing convention: enable the router, strip `/{name}`,
/// serve on the `http` entry point and group under backend `{name}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraefikTags;

impl TagPolicy for TraefikTags {
    fn tags(&self, service_name: &str) -> Vec<String> {
        vec![
            "traefik.enable=true".to_string(),
            format!("traefik.frontend.rule=Host:localhost;PathPrefixStrip:/{}", service_name),
            "traefik.frontend.entryPoints=http".to_string(),
            format!("traefik.backend={}", service_name),
        ]
    }
}

/// Adds nothing; registrations carry only caller tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTags;

impl TagPolicy for NoTags {
    fn tags(&self, _service_name: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Caller tags first, in order, then the policy's tags.
pub fn augment(caller: &[String], policy: &dyn TagPolicy, service_name: &str) -> Vec<String> {
    let mut tags = caller.to_vec();
    tags.extend(policy.tags(service_name));
    tags
}
