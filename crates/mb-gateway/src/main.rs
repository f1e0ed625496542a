//! mb-gateway: Messenger ⇄ Dialogflow bridge binary
//!
//! Usage:
//!   mb-gateway           - Start the webhook server
//!   mb-gateway --help    - Show help
//!   mb-gateway --version - Show version

use std::sync::Arc;

use mb_core::{
    ActionRouter, ColorCatalog, Config, DialogflowClient, NluClient, OpenWeatherClient, PreferenceStore,
    SqlitePreferenceStore, WeatherLookup,
};
use mb_facebook::MessengerBot;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Run mode
enum RunMode {
    /// Webhook server
    Server,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args() {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("mb-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting mb-gateway...");
    tracing::info!(
        "Dialogflow project: {} ({})",
        config.dialogflow.project_id,
        config.dialogflow.language_code
    );

    run_server(config).await
}

/// Parse command line arguments
fn parse_args() -> RunMode {
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("mb-gateway - Messenger to Dialogflow bridge");
    println!();
    println!("Usage:");
    println!("  mb-gateway           Start the webhook server");
    println!("  mb-gateway --help    Show this help message");
    println!("  mb-gateway --version Show version");
    println!();
    println!("Configuration is read from mb-gateway.toml when present, then from the environment.");
    println!();
    println!("Environment Variables:");
    println!("  FB_PAGE_TOKEN        Page access token (required)");
    println!("  FB_VERIFY_TOKEN      Webhook verify token (required)");
    println!("  FB_GRAPH_URL         Graph API base (default: https://graph.facebook.com/v3.2)");
    println!("  GOOGLE_PROJECT_ID    Dialogflow project id (required)");
    println!("  DF_LANGUAGE_CODE     Query language (default: en-US)");
    println!("  DF_ACCESS_TOKEN      Dialogflow bearer token (required)");
    println!("  DF_BASE_URL          Dialogflow REST base URL");
    println!("  WEATHER_API_KEY      OpenWeatherMap key (optional)");
    println!("  WEATHER_BASE_URL     OpenWeatherMap base URL");
    println!("  PORT                 Webhook port (default: 5000)");
    println!("  DB_PATH              SQLite database path (default: data/mb-gateway.db)");
    println!("  REPLY_INTERVAL_MS    Gap between reply messages (default: 1100)");
    println!("  SESSION_TTL_SECS     Idle session lifetime (default: 3600)");
}

/// Build the stack and serve until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(
        SqlitePreferenceStore::new(&config.storage.db_path)
            .map_err(|e| anyhow::anyhow!("Failed to open preference store: {}", e))?,
    );
    tracing::info!("Preference store: {}", config.storage.db_path);

    let weather: Option<Arc<dyn WeatherLookup>> = if config.weather.api_key.is_some() {
        let client = OpenWeatherClient::new(&config.weather)
            .map_err(|e| anyhow::anyhow!("Failed to create weather client: {}", e))?;
        Some(Arc::new(client))
    } else {
        tracing::info!("Weather lookup disabled (no WEATHER_API_KEY)");
        None
    };

    let nlu: Arc<dyn NluClient> = Arc::new(
        DialogflowClient::new(&config.dialogflow)
            .map_err(|e| anyhow::anyhow!("Failed to create Dialogflow client: {}", e))?,
    );

    let preferences: Arc<dyn PreferenceStore> = store.clone();
    let catalog: Arc<dyn ColorCatalog> = store;
    let router = ActionRouter::with_default_actions(preferences, catalog, weather);
    tracing::info!("Registered {} actions: {:?}", router.len(), router.action_names());

    let bot = MessengerBot::new(&config, nlu, router)
        .map_err(|e| anyhow::anyhow!("Failed to create Messenger bot: {}", e))?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut server = tokio::spawn(async move { bot.run(shutdown_rx).await });

    tracing::info!("mb-gateway initialized successfully");
    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
            let _ = shutdown_tx.send(());
        }
        result = &mut server => {
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::anyhow!("Webhook server error: {}", e)),
                Err(e) => Err(anyhow::anyhow!("Webhook server task failed: {}", e)),
            };
        }
    }

    server
        .await
        .map_err(|e| anyhow::anyhow!("Webhook server task failed: {}", e))?
        .map_err(|e| anyhow::anyhow!("Webhook server error: {}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}
