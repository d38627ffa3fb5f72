//! Main Entrypoint for the Debate API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the argument evaluator (LLM-backed with offline fallback, or
//!    fully offline in demo mode).
//! 3. Constructing the debate engine over the in-memory session store.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use debate_api::{config::Config, router::create_router, state::AppState};
use debate_core::{
    ArgumentEvaluator, DebateEngine, FallbackEvaluator, HeuristicEvaluator, LLMEvaluator,
    MemoryStore,
    llm_client::{LLMClient, OpenAICompatibleClient},
};
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// A helper function to load prompts from a directory.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

fn heuristic(config: &Config) -> HeuristicEvaluator {
    match config.fallback_seed {
        Some(seed) => HeuristicEvaluator::with_seed(seed),
        None => HeuristicEvaluator::new(),
    }
}

fn build_evaluator(config: &Config) -> anyhow::Result<Arc<dyn ArgumentEvaluator>> {
    if config.demo_mode {
        info!("Demo mode enabled: all arguments are evaluated offline.");
        return Ok(Arc::new(heuristic(config)));
    }

    let prompts = load_prompts(&config.prompts_path)?;
    for key in ["score_argument", "counter_argument", "debate_analysis"] {
        if !prompts.contains_key(key) {
            anyhow::bail!("{}.md not found in prompts directory", key);
        }
    }

    let api_key = config
        .api_key()
        .context("No API key configured for the selected provider")?;
    info!(provider = ?config.provider, "Using OpenAI-compatible provider.");
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.provider.api_base());
    let client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));

    let primary = Arc::new(LLMEvaluator::new(client, prompts));
    Ok(Arc::new(FallbackEvaluator::new(primary, heuristic(config))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 2. Initialize Evaluator and Engine ---
    let evaluator = build_evaluator(&config)?;
    let engine = Arc::new(DebateEngine::new(Arc::new(MemoryStore::new()), evaluator));
    let app_state = Arc::new(AppState::new(engine));

    // --- 3. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 4. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        demo_mode = config.demo_mode,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
