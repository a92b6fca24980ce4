//! Problem Radar — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the pipeline, the evaluation store,
//! and the metrics exporter.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hn_problem_radar::api::{self, AppState};
use hn_problem_radar::cache::CacheDir;
use hn_problem_radar::config::HttpTuning;
use hn_problem_radar::feeds::FeedStore;
use hn_problem_radar::gemini::GeminiClient;
use hn_problem_radar::metrics::Metrics;
use hn_problem_radar::passes::GeminiRunner;
use hn_problem_radar::pipeline::Pipeline;
use hn_problem_radar::store::SupabaseStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hn_problem_radar=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();
    let metrics = Metrics::init();

    let tuning = HttpTuning::from_env();
    let cache = CacheDir::from_env();

    let store = Arc::new(SupabaseStore::new(tuning));
    let pipeline = Pipeline::new(
        Arc::new(FeedStore::new(&cache, tuning)),
        Arc::new(GeminiRunner::new(&cache, GeminiClient::new(tuning))),
        store.clone(),
    );

    let state = AppState::new(Arc::new(pipeline), store);
    let router = api::create_router(state).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
