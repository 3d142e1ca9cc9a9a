//! Talebound Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talebound_engine::{
    api,
    infrastructure::{
        openai::OpenAiClient,
        resilient_llm::ResilientLlmClient,
        sqlite::SqliteRepositories,
    },
    App, EngineConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talebound_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Talebound Engine");

    let config = EngineConfig::from_env();

    // Open the game store
    tracing::info!(database_url = %config.database_url, "Opening SQLite store");
    let repos = SqliteRepositories::connect(&config.database_url).await?;

    // Create the narrative generator client
    let openai = Arc::new(OpenAiClient::new(
        &config.llm_base_url,
        &config.llm_model,
        config.llm_api_key.clone(),
        config.llm_timeout_secs,
    ));
    let generator_configured = openai.is_configured();
    if generator_configured {
        tracing::info!(model = %openai.model(), base_url = %config.llm_base_url, "Narrative generator configured");
    } else {
        tracing::warn!("LLM_API_KEY not set, every narration will use a fallback");
    }
    let retry_config = config.retry_config();
    tracing::info!(
        "LLM client configured with retry: max_retries={}, base_delay_ms={}",
        retry_config.max_retries,
        retry_config.base_delay_ms
    );
    let llm = Arc::new(ResilientLlmClient::new(openai, retry_config));

    // Create application
    let app = Arc::new(App::new(
        repos,
        llm,
        config.generator_settings(),
        generator_configured,
    ));

    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(config.cors_allowed_origins.as_deref()) {
        router = router.layer(cors);
    }

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer(allowed_origins: Option<&str>) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins.map(str::trim).filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // Clients send bearer tokens and JSON bodies, both of which trigger preflights.
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
