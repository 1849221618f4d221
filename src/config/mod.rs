use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub recovery: RecoverySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Status for unmatched routes. The service this one replaces answered
    /// 500; set this to 500 to reproduce that.
    #[serde(default = "default_not_found_status")]
    pub not_found_status: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoverySettings {
    #[serde(default)]
    pub print_stack: bool,
}

fn default_not_found_status() -> u16 {
    404
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_dir =
            std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::from(
                PathBuf::from(&config_dir).join("default.toml"),
            ))
            .add_source(
                config::File::from(PathBuf::from(&config_dir).join("local.toml"))
                    .required(false),
            )
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
