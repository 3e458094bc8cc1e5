use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gemini_core::client::GeminiClient;
use gemini_linebot::config::Cli;
use gemini_linebot::dispatcher::Dispatcher;
use gemini_linebot::http_server::{self, AppState};
use gemini_memory::adapters::{FirebaseMemoryStore, InMemoryMemoryStore};
use gemini_memory::store::MemoryStoreRef;
use line_messaging::client::MessagingClient;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, the environment may already be set
    let dotenv = dotenvy::dotenv();

    let args = Cli::parse();

    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }
    info!("Starting linebot daemon...");

    let config = args.into_config().context("Configuration error")?;

    // Initialize Gemini client
    let gemini = GeminiClient::new(config.gemini.clone()).context("Failed to initialize Gemini client")?;
    info!(
        model = config.gemini.text_model(),
        vision_model = config.gemini.vision_model(),
        "Initialized Gemini client"
    );

    let messenger = MessagingClient::with_base_urls(
        config.channel_access_token.clone(),
        &config.line_api_base,
        &config.line_data_api_base,
    );

    // Initialize conversation memory
    let memory: MemoryStoreRef = match &config.firebase_url {
        Some(url) => {
            let store = FirebaseMemoryStore::new(url, config.firebase_credentials.as_deref())
                .context("Failed to initialize Realtime Database store")?;
            info!(url = %url, authenticated = config.firebase_credentials.is_some(), "Using Realtime Database memory");
            Arc::new(store)
        }
        None => {
            warn!("FIREBASE_URL not set, conversation memory is kept in process only");
            Arc::new(InMemoryMemoryStore::new())
        }
    };
    info!(
        root = %config.dispatch.memory_root,
        scope = ?config.dispatch.memory_scope,
        max_turns = config.dispatch.retention.max_turns,
        history_mode = %config.dispatch.history_mode,
        "Memory settings"
    );

    let dispatcher = Dispatcher::new(
        Arc::new(gemini),
        Arc::new(messenger),
        memory,
        config.dispatch.clone(),
    );
    let state = AppState::new(&config.channel_secret, dispatcher);

    http_server::run_server(state, config.http_addr).await?;

    info!("linebot daemon shutting down");
    Ok(())
}
