mod api;
mod middleware;
mod runs;
mod scheduler;

use std::sync::Arc;

use kwdb_db::PgKeywordStore;
use kwdb_research::{AutoCollector, CollectorSettings};
use kwdb_searchad::ApiClients;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(kwdb_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = kwdb_db::PoolConfig::from_app_config(&config);
    let pool = kwdb_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = kwdb_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let credentials = kwdb_core::load_credentials(&config.credentials_path)?;
    let clients = ApiClients::from_config(&config, &credentials)?;
    let search_ad_keys = Arc::clone(clients.search_ad.pool());
    let doc_count_keys = Arc::clone(clients.doc_count.pool());

    let collector = Arc::new(AutoCollector::new(
        Arc::new(clients.search_ad),
        Arc::new(clients.doc_count),
        Arc::new(PgKeywordStore::new(pool.clone())),
        CollectorSettings::from_config(&config),
    ));

    let state = AppState {
        pool,
        collector,
        search_ad_keys,
        doc_count_keys,
        default_target: config.auto_collect_target,
    };

    let _scheduler = scheduler::build_scheduler(state.clone(), &config).await?;

    let auth = AuthState::from_env(matches!(config.env, kwdb_core::Environment::Development))?;
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "kwdb-server listening");
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
