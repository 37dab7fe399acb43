use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use vote_backend::{bootstrap::prepare, config::AppConfig};

#[rocket::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚀 Starting vote server");

    let rocket = match prepare(AppConfig::figment()).await {
        Ok(rocket) => rocket,
        Err(e) => {
            error!("✗ Boot aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    warn!("starting the web service");

    match rocket.launch().await {
        Ok(_) => {
            info!("Server shut down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("✗ Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
