//! Chat Relay - serves the relay endpoint in front of Gemini.

use std::env;
use std::sync::Arc;

use chat_relay::{api, AppState, Config, GeminiProvider};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("chat-relay {}", VERSION);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()
        .map_err(|e| format!("Failed to load configuration: {}", e))?;

    tracing::info!(
        "Starting chat-relay {}: model={} provider={}",
        VERSION,
        config.provider.model,
        config.provider.base_url
    );
    if config.provider.api_key().is_none() {
        tracing::warn!(
            "No API key configured (RELAY__PROVIDER__API_KEY, GEMINI_API_KEY or GEMINI_API_KEY_CHLOE); chat requests will fail"
        );
    }

    let provider = Arc::new(GeminiProvider::new(&config.provider.base_url));
    let state = Arc::new(AppState::new(config.clone(), provider));

    // Build router
    let app = api::router(state);

    // Start server
    let addr = format!("{}:{}", config.api.host, config.api.port);
    tracing::info!("Listening on {} (relay at {})", addr, config.api.path);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
