use mimalloc::MiMalloc;
use postboard::config::Config;
use postboard::db::Storage;
use postboard::router::{AppState, app_router};
use postboard::upload::UploadStore;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_path = %cfg.database_path.display(),
        upload_dir = %cfg.upload_dir.display(),
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel
    );

    // Without storage the service has nothing to serve: abort startup.
    let storage = match Storage::open(&cfg.database_path).await {
        Ok(storage) => storage,
        Err(e) => {
            error!(path = %cfg.database_path.display(), error = %e, "failed to open database");
            return Err(e.into());
        }
    };
    match storage.migrate().await {
        Ok(applied) => info!(?applied, "database schema ready"),
        Err(e) => {
            error!(error = %e, "database migration failed");
            return Err(e.into());
        }
    }

    let state = AppState::new(storage.clone(), UploadStore::from_config(&cfg));
    let app = app_router(state, &cfg);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.pool().close().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
