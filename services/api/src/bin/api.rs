//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        contract_llm::OpenAiContractAdapter, db::DbAdapter, fixture_llm::FixtureAiDelegate,
    },
    config::Config,
    error::ApiError,
    web::{build_router, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use contract_core::ports::{AiDelegate, DatabaseService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the AI Delegate ---
    let delegate: Arc<dyn AiDelegate> = match config.openai_api_key.as_deref() {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            info!("Using OpenAI model {}", config.contract_model);
            Arc::new(OpenAiContractAdapter::new(
                openai_client,
                config.contract_model.clone(),
            ))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; AI endpoints will return fixture responses");
            Arc::new(FixtureAiDelegate)
        }
    };

    // --- 4. Build the Shared AppState & Router ---
    let db: Arc<dyn DatabaseService> = db_adapter;
    let app_state = Arc::new(AppState::new(config.clone(), db, delegate));
    let app = build_router(app_state)?;

    // --- 5. Start the Server ---
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
        signal_token.cancel();
    });

    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
