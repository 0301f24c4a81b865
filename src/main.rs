use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use afpi_gateway::config::{GatewayConfig, LogFormat};
use afpi_gateway::db::Db;
use afpi_gateway::repo_tools::GitHubClient;
use afpi_gateway::secrets::select_secret_source;
use afpi_gateway::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("invalid configuration")?;
    init_tracing(config.log_format);

    let secrets = select_secret_source(&config.github, &config.secret_manager_url)
        .context("failed to set up repository token source")?;
    tracing::info!(
        source = secrets.describe(),
        owner = %config.github.owner,
        repo = %config.github.repo,
        "repository token source selected"
    );
    let github = GitHubClient::new(&config.github, secrets).context("failed to build GitHub client")?;
    let db = Db::open(&config.database_path)
        .with_context(|| format!("failed to open database at {}", config.database_path))?;

    let bind_addr = config.bind_addr;
    let app = router(AppState::new(config, github, db));

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "application_startup");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("application_shutdown");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}
