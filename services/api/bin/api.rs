//! Main Entrypoint for the Tutor API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the content generator for the configured provider.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tutor_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use tutor_core::{
    CannedContentGenerator, ContentGenerator, LLMContentGenerator, QuestionBank, Tutor,
    TutorSettings,
    generator::load_prompts,
    llm_client::OpenAICompatibleClient,
};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

fn llm_generator(
    config: &Config,
    api_key: Option<&String>,
    api_base: &str,
) -> anyhow::Result<Arc<dyn ContentGenerator>> {
    let api_key = api_key.context("API key missing for the configured provider")?;
    let prompts = load_prompts(&config.prompts_path)?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    let client = OpenAICompatibleClient::new(openai_config, config.chat_model.clone());
    Ok(Arc::new(LLMContentGenerator::new(Arc::new(client), prompts)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let bank = Arc::new(QuestionBank::builtin());
    let generator: Arc<dyn ContentGenerator> = match &config.provider {
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            llm_generator(
                &config,
                config.openai_api_key.as_ref(),
                "https://api.openai.com/v1/",
            )?
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            llm_generator(
                &config,
                config.gemini_api_key.as_ref(),
                "https://generativelanguage.googleapis.com/v1beta/openai",
            )?
        }
        Provider::Offline => {
            info!("Using offline content from the question bank.");
            Arc::new(CannedContentGenerator::new(bank.clone()))
        }
    };

    let settings = TutorSettings {
        default_topic: config.default_topic.clone(),
        generator_timeout: config.generator_timeout,
        ..TutorSettings::default()
    };
    let app_state = Arc::new(AppState {
        tutor: Arc::new(Tutor::new(generator, bank, settings)),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
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
