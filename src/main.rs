use std::sync::Arc;

use huygens::config::Config;
use huygens::host::{AppPaths, StaticSite};
use huygens::server::SocketServer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let app = Arc::new(StaticSite::new(AppPaths::from_config(&cfg.site)));
    let server = SocketServer::bind(&cfg.server, app).await?;
    info!(url = %server.root_url()?, root = %cfg.site.physical_path.display(), "Serving site");

    let shutdown = server.shutdown_handle();
    let mut serving = tokio::spawn(server.run());

    tokio::select! {
        res = &mut serving => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            shutdown.shutdown();
            serving.await??;
        }
    }

    Ok(())
}
