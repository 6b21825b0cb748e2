use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub source: SourceSettings,
    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    /// DynamoDB-compatible endpoint, e.g. DynamoDB Local or a signing gateway
    pub endpoint: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub api_token: Option<String>,
    /// Maximum items per scan page; the service default applies when unset
    #[serde(default)]
    pub page_limit: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "water_tank_sensor".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreSettings {
    /// Background refresh period; no background refresh when unset
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
}

impl StoreSettings {
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Load `config/tank.{toml,json,yaml}` if present, overridden by `TANK__*`
/// environment variables (e.g. `TANK__SOURCE__ENDPOINT`).
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/tank").required(false))
        .add_source(
            config::Environment::with_prefix("TANK")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
