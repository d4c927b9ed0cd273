//! WorldForge Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldforge_engine::api;
use worldforge_engine::app::App;
use worldforge_engine::infrastructure::{
    clock::SystemClock, config::AppConfig, openai::OpenAiClient, ports::ClockPort,
    world_repo::SqliteWorldRepo,
};
use worldforge_engine::use_cases::scene::GenerationSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine is often run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldforge_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting WorldForge Engine");

    // Load configuration
    let config = AppConfig::from_env();
    tracing::debug!(llm = ?config.llm, scene = ?config.scene, "Configuration loaded");

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    // Open world storage
    tracing::info!(path = %config.worlds_db, "Opening world database");
    let world_repo = Arc::new(SqliteWorldRepo::new(&config.worlds_db, clock.clone()).await?);

    // Completion provider, constructed once and shared
    tracing::info!(
        provider = ?config.llm.provider,
        base_url = %config.llm.base_url,
        model = %config.llm.model,
        "Completion provider configured"
    );
    let llm = Arc::new(OpenAiClient::from_config(&config.llm));

    let generation = GenerationSettings {
        model: Some(config.llm.model.clone()),
        max_tokens: None,
        extraction: config.scene.extraction,
        strict_validation: config.scene.strict_validation,
        lock_per_world: config.scene.lock_per_world,
    };

    // Create application
    let app = Arc::new(App::new(world_repo, llm, clock, generation));

    let router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config.cors_allowed_origins.as_deref()));

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

/// CORS for the browser client. Unset origins allow any origin.
fn build_cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = match allowed_origins {
        None | Some("*") => return cors.allow_origin(Any),
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect(),
    };

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS has no valid origins, allowing any origin");
        return cors.allow_origin(Any);
    }

    cors.allow_origin(origins)
}
