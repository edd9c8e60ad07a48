use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub downstreams: Downstreams,
    pub retry: RetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// One entry per downstream: address plus per-call deadline. Resolved once
/// at process start; nothing is hard-coded at call sites.
#[derive(Debug, Deserialize, Clone)]
pub struct Downstreams {
    pub auth: DownstreamConfig,
    pub visa: DownstreamConfig,
    pub booking: DownstreamConfig,
    pub flight_search: DownstreamConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownstreamConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl DownstreamConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. `CONCOURSE__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("CONCOURSE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
