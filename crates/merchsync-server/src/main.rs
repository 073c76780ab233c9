mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(merchsync_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = merchsync_db::PoolConfig::from_app_config(&config);
    let pool = merchsync_db::connect_pool(&config.database_url, pool_config).await?;
    merchsync_db::run_migrations(&pool).await?;

    let registry = Arc::new(merchsync_feed::build_registry(pool.clone(), &config));
    let upload_client = Arc::new(merchsync_feed::UploadClient::new(
        config.graph_api_base.clone(),
        config.meta_access_token.clone(),
        config.http_request_timeout_secs,
    )?);

    let _scheduler = scheduler::build_scheduler(
        Arc::clone(&registry),
        Arc::clone(&upload_client),
        Arc::clone(&config),
    )
    .await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        merchsync_core::Environment::Development
    ))?;
    let app = build_app(
        AppState {
            pool,
            registry,
            upload_client,
            config: Arc::clone(&config),
        },
        auth,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
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

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
