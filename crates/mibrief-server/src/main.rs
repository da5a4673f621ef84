mod api;
mod middleware;
mod runner;
mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mibrief_db::PgCardStore;
use mibrief_ingest::IngestConfig;
use mibrief_llm::PerplexityClient;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    runner::IngestRunner,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(mibrief_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = mibrief_db::PoolConfig::from_app_config(&config);
    let pool = mibrief_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = mibrief_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let store = Arc::new(PgCardStore::new(pool));

    let runner = match config.perplexity_api_key.as_deref() {
        Some(api_key) => {
            let plan = mibrief_core::load_pillars(&config.pillars_path).with_context(|| {
                format!("loading pillar plan from {}", config.pillars_path.display())
            })?;
            let llm = PerplexityClient::with_base_url(
                api_key,
                config.llm_timeout_secs,
                &config.perplexity_base_url,
            )?
            .with_retry(config.llm_max_retries, config.llm_retry_backoff_ms);
            Some(Arc::new(IngestRunner::new(
                Arc::new(llm),
                store.clone(),
                store.clone(),
                plan,
                IngestConfig::from_app_config(&config),
            )))
        }
        None => {
            tracing::warn!("PERPLEXITY_API_KEY not set; scheduled and API-triggered ingestion disabled");
            None
        }
    };

    let _scheduler = match &runner {
        Some(runner) => Some(scheduler::build_scheduler(Arc::clone(runner), &config.ingest_cron).await?),
        None => None,
    };

    let auth = AuthState::from_env(matches!(config.env, mibrief_core::Environment::Development))?;
    let state = AppState {
        store: store.clone(),
        ledger: store,
        runner,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "mibrief server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
