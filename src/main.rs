use clap::Parser;
use tracing::{error, info};

use malay2sql::api::client::HttpBackend;
use malay2sql::config::{AppConfig, CliArgs};
use malay2sql::repl;
use malay2sql::session::QuerySessionManager;
use malay2sql::util::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if config.api.token.is_none() {
        info!("No API token configured; requests will be sent unauthenticated");
    }

    info!("Connecting to translation service at {}", config.api.base_url);
    let backend = HttpBackend::new(&config.api)?;
    let session = QuerySessionManager::new(backend);

    match repl::run(&session).await {
        Ok(()) => info!("Session closed"),
        Err(e) => {
            error!("Session error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
