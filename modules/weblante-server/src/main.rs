use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use weblante_common::{Config, SessionContext};
use weblante_engine::DecisionEngine;

mod app;

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

use app::AppState;

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("weblante=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    config.log_keys();

    let session = SessionContext::new(config.child_age);
    match session.policy {
        Some(policy) => info!(
            session_id = %session.session_id,
            age_class = %policy.class,
            threshold = policy.threshold,
            "Session started"
        ),
        None => warn!(
            session_id = %session.session_id,
            age = ?config.child_age,
            "No age policy for this session, age-gated checks disabled"
        ),
    }

    let engine = DecisionEngine::from_config(&config);
    info!(stages = ?engine.stage_names(), "Decision pipeline ready");

    let cache = engine.cache().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            cache.evict_expired().await;
        }
    });

    let state = Arc::new(AppState { engine, session });
    let app = app::router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Weblante backend listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
