use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use warp::Filter;

mod agents;
mod api;
mod clients;
mod config;
mod error;
mod middleware;
mod models;
mod pipeline;
mod serialize;
mod state;

use clients::generation::OpenAiClient;
use clients::search::HttpSearchClient;
use clients::{GenerationClient, SearchClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone())),
        )
        .json()
        .init();

    info!("Starting multi-agent RAG QA orchestrator");

    // One HTTP client shared by both external service clients
    let http = reqwest::Client::new();

    let generation: Arc<dyn GenerationClient> = Arc::new(OpenAiClient::new(
        http.clone(),
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.openai_model.clone(),
    ));
    let search: Arc<dyn SearchClient> = Arc::new(HttpSearchClient::new(
        http,
        config.vector_db_service_url.clone(),
    ));

    // The compiled pipeline is built once and shared read-only across
    // concurrently handled requests.
    let orchestrator = Arc::new(pipeline::Orchestrator::new(
        generation,
        search,
        config.top_k,
        Duration::from_secs(config.request_timeout_secs),
    ));
    info!("Pipeline compiled");

    let metrics = api::Metrics::register()?;

    // Build API routes
    let api_routes = api::routes(orchestrator, metrics)
        .recover(error::handle_rejection)
        .with(warp::log("api"))
        .with(middleware::cors());

    // Health check route
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({"status": "healthy"})));

    // Metrics route
    let metrics_route = warp::path("metrics").and(warp::get()).map(|| {
        use prometheus::{Encoder, TextEncoder};
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer).unwrap();
        warp::reply::with_header(buffer, "Content-Type", encoder.format_type())
    });

    let routes = health.or(metrics_route).or(api_routes);

    // Start server
    let addr = ([0, 0, 0, 0], config.port);
    info!("Server listening on {}", addr.1);

    warp::serve(routes).run(addr).await;

    Ok(())
}
