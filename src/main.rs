use anyhow::Context;
use consul_registry::{
    config::AgentConfig,
    health_endpoint::{bind_health, serve_health},
    RegistryClient, ServiceRegistration,
};
use std::net::SocketAddr;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1) Load config; env vars override the registry section.
    let path = std::env::args().nth(1).unwrap_or_else(|| "registry.yaml".to_string());
    let mut cfg = AgentConfig::from_file(&path)?;
    cfg.registry = cfg.registry.with_env_overrides();
    let svc = cfg.service;

    // 2) Health endpoint must be up before the registry starts polling it.
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let listen: SocketAddr = ([0, 0, 0, 0], svc.port).into();
    let listener = bind_health(listen)
        .await
        .with_context(|| format!("binding health endpoint on {}", listen))?;
    let health_path = svc.health_path.clone();
    let server = tokio::spawn(async move {
        serve_health(listener, &health_path, async move {
            let _ = stop_rx.await;
        })
        .await
    });

    // 3) Register.
    let client = RegistryClient::with_config(&cfg.registry)?;
    let mut reg = ServiceRegistration::new(
        svc.id.clone(),
        svc.name.clone(),
        svc.host.clone(),
        svc.port,
        svc.health_check_url(),
    );
    reg.tags = svc.tags.clone();
    client.register(&reg).await?;
    log::info!("registered {} as {} with {}", svc.name, svc.id, cfg.registry.address);

    // 4) Resolve ourselves. Fails until the first check passes.
    match client.resolve_base_url(&svc.name).await {
        Ok(url) => log::info!("{} resolves to {}", svc.name, url),
        Err(e) => log::warn!("{}", e),
    }

    // 5) Deregister on ctrl-c.
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    client.deregister(&svc.id).await?;
    log::info!("deregistered {}", svc.id);

    let _ = stop_tx.send(());
    server.await??;
    Ok(())
}
