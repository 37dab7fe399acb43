use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use rocket::figment::providers::{Env, Format, Serialized, Toml};
use rocket::figment::{Figment, Profile};
use serde::{Deserialize, Serialize};
use tracing::info;
use vote_shared::TeamRoster;

use crate::error::BootError;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TEAM_COUNT: u32 = 14;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub address: IpAddr,
    pub port: u16,
    pub broker_url: String,
    pub queue_name: String,
    pub store_url: String,
    pub team_count: u32,
    pub io_timeout_ms: u64,
    pub validate_votes: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            broker_url: "redis://127.0.0.1:6379/".into(),
            queue_name: "votes".into(),
            store_url: "redis://127.0.0.1:6379/".into(),
            team_count: DEFAULT_TEAM_COUNT,
            io_timeout_ms: 2000,
            validate_votes: true,
        }
    }
}

impl AppConfig {
    /// Rocket's own provider chain with our defaults layered underneath, so
    /// `Rocket.toml`, `ROCKET_*` and `VOTE_*` all override them.
    pub fn figment() -> Figment {
        Figment::from(rocket::Config::default())
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(Env::var_or("ROCKET_CONFIG", "Rocket.toml")).nested())
            .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
            .merge(Env::prefixed("VOTE_").global())
            .select(Profile::from_env_or("ROCKET_PROFILE", rocket::Config::DEFAULT_PROFILE))
    }

    pub fn load(figment: &Figment) -> Result<Self, BootError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| BootError::Config(e.to_string()))?;
        config.check()?;
        info!(
            "Config loaded: {}:{}, queue '{}', {} teams",
            config.address, config.port, config.queue_name, config.team_count
        );
        Ok(config)
    }

    fn check(&self) -> Result<(), BootError> {
        if self.queue_name.trim().is_empty() {
            return Err(BootError::Config("queue_name must not be empty".into()));
        }
        if self.team_count == 0 {
            return Err(BootError::Config("team_count must be at least 1".into()));
        }
        if self.io_timeout_ms == 0 {
            return Err(BootError::Config("io_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn roster(&self) -> TeamRoster {
        TeamRoster::sequential(self.team_count)
    }
}
