mod config;
mod server;

use bucket_store::Pipeline;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = config::DaemonConfig::from_env()?;
    info!(
        root = %config.store.root.display(),
        algorithm = config.store.algorithm.as_str(),
        max_content_length = config.store.max_content_length,
        replicas = config.store.replicas.len(),
        bind = %config.bind_addr,
        "bucketd starting"
    );

    let bind_addr = config.bind_addr.clone();
    let pipeline = Pipeline::new(config.store)?;
    server::run(&bind_addr, pipeline).await
}
