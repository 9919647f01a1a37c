use std::net::SocketAddr;
use std::sync::Arc;

use quiz_backend::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    routes,
    store::{MemoryStore, PgStore},
    telemetry::init_tracing,
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = get_config();

    let app_state = match config.database_url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.db_max_connections).await?;
            run_migrations(&pool).await?;
            info!("Using Postgres store");
            AppState::new(Arc::new(PgStore::new(pool)), config)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, using the in-memory store; data is lost on exit");
            AppState::new(Arc::new(MemoryStore::new()), config)
        }
    };

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let admin = app_state
            .user_service
            .ensure_admin(username, &config.admin_email, password)
            .await?;
        info!(user_id = admin.id, "Admin account ready");
    }

    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
