//! Warden Auth API server

use std::net::SocketAddr;
use std::sync::Arc;

use auth_api::{build_router, AppState, Config, StoreBackend};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use warden_auth_core::AuthService;
use warden_db::{MemoryPrincipalRepository, PrincipalRepository, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("auth_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Warden Auth API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        store_backend = ?config.store_backend,
        session_backend = ?config.auth.session_backend,
        "Configuration loaded"
    );

    // Credential store
    let repo: Arc<dyn PrincipalRepository> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;
            let pool = warden_db::create_pool(database_url).await?;
            warden_db::run_migrations(&pool).await?;
            tracing::info!("Database pool created and migrations applied");
            Arc::new(Repositories::new(pool).principals)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; principals are lost on restart");
            Arc::new(MemoryPrincipalRepository::new())
        }
    };

    // Create auth service
    let auth = AuthService::new(config.auth.clone(), repo)?;

    // Create application state
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(auth, config);

    // Build HTTP router
    let app = build_router(state);

    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
