//! Process boot: build the extensions, register them, fire the startup
//! signal, then hand Rocket a fully connected state. Any failure before
//! the last step aborts boot and nothing is served.

use std::sync::Arc;

use rocket::figment::Figment;
use rocket::{catchers, routes, Build, Rocket};
use tracing::info;

use crate::catchers::{bad_request, internal_error, not_found, unavailable, unprocessable};
use crate::config::AppConfig;
use crate::error::{BootError, SignalError};
use crate::queue::QueueProducer;
use crate::registry::{ExtensionRegistry, QUEUE_EXTENSION, STORE_EXTENSION};
use crate::routes::{health, place_vote, teams, votes, AppState};
use crate::signal::{StartProducers, StartupSignal};
use crate::store::CounterStore;

pub fn build_registry(config: &AppConfig) -> Result<ExtensionRegistry, BootError> {
    let mut registry = ExtensionRegistry::new();
    registry.register(
        QUEUE_EXTENSION,
        Arc::new(QueueProducer::new(&config.broker_url, &config.queue_name, config.io_timeout())),
    )?;
    registry.register(
        STORE_EXTENSION,
        Arc::new(CounterStore::new(&config.store_url, config.io_timeout())),
    )?;
    Ok(registry)
}

pub fn startup_signal() -> Result<StartupSignal, BootError> {
    let mut signal = StartupSignal::new();
    signal.connect(StartProducers)?;
    Ok(signal)
}

/// Fires `signal` against `registry` and freezes the registry.
pub async fn start(registry: ExtensionRegistry, signal: &StartupSignal) -> Result<Arc<ExtensionRegistry>, BootError> {
    signal.fire(&registry).await.map_err(|e| match e {
        SignalError::Startup(e) => BootError::Startup(e),
        other => BootError::Signal(other),
    })?;
    info!("{} extensions started", registry.len());
    Ok(Arc::new(registry))
}

pub fn build_rocket(figment: Figment, state: AppState) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![teams, place_vote, votes, health])
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                unprocessable,
                internal_error,
                unavailable
            ],
        )
}

/// Loads config, connects every extension and returns a Rocket ready to
/// launch.
pub async fn prepare(figment: Figment) -> Result<Rocket<Build>, BootError> {
    let config = AppConfig::load(&figment)?;

    let registry = build_registry(&config)?;
    let signal = startup_signal()?;
    let registry = start(registry, &signal).await?;

    let state = AppState::from_registry(&registry, config.roster(), config.validate_votes)?;
    Ok(build_rocket(figment, state).manage(registry))
}
