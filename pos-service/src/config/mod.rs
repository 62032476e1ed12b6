use dotenvy::dotenv;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const SQUARE_SANDBOX_URL: &str = "https://connect.squareupsandbox.com";
const SQUARE_API_VERSION: &str = "2024-10-17";

#[derive(Deserialize, Clone, Debug)]
pub struct PosConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub square: SquareConfig,
}

/// Where local order and payment records are kept.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SquareConfig {
    pub access_token: Secret<String>,
    /// Location every order and payment is bound to.
    pub location_id: String,
    pub api_base_url: String,
    pub api_version: String,
    pub timeout_seconds: u64,
}

impl PosConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let common = core_config::Config::load()?;

        let store: StoreBackend = get_env("POS_STORE", Some("postgres"))?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database_url = match store {
            StoreBackend::Postgres => get_env("POS_DATABASE_URL", None)?,
            StoreBackend::Memory => env::var("POS_DATABASE_URL").unwrap_or_default(),
        };

        let config = PosConfig {
            common,
            service_name: get_env("SERVICE_NAME", Some("pos-service"))?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")))?,
            log_level: get_env("LOG_LEVEL", Some("info,pos_service=debug,sqlx=warn"))?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            store,
            database: DatabaseConfig {
                url: Secret::new(database_url),
                max_connections: parse_env("POS_DATABASE_MAX_CONNECTIONS", "10")?,
                min_connections: parse_env("POS_DATABASE_MIN_CONNECTIONS", "1")?,
            },
            square: SquareConfig {
                access_token: Secret::new(get_env("SQUARE_ACCESS_TOKEN", Some(""))?),
                location_id: get_env("SQUARE_LOCATION_ID", None)?,
                api_base_url: get_env("SQUARE_API_BASE_URL", Some(SQUARE_SANDBOX_URL))?,
                api_version: get_env("SQUARE_API_VERSION", Some(SQUARE_API_VERSION))?,
                timeout_seconds: parse_env("SQUARE_TIMEOUT_SECONDS", "30")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.square.location_id.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SQUARE_LOCATION_ID must not be empty"
            )));
        }

        if self.store == StoreBackend::Postgres {
            if self.database.url.expose_secret().is_empty() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "POS_DATABASE_URL must be set for the postgres store"
                )));
            }

            if self.database.max_connections == 0
                || self.database.min_connections > self.database.max_connections
            {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "database pool bounds are invalid: min {} / max {}",
                    self.database.min_connections,
                    self.database.max_connections
                )));
            }
        }

        if self.square.timeout_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SQUARE_TIMEOUT_SECONDS must be positive"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => default.map(str::to_string).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!("{} is required but not set", key))
        }),
    }
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default))?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}
