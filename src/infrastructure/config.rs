use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::domain::period::WeekStart;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub reports: ReportRules,
    #[serde(default)]
    pub cash: CashRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_pool_max")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_pool_max(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_seconds: u64,
    #[serde(default)]
    pub developer_credential: String,
    #[serde(default)]
    pub bypass_auth: bool,
    #[serde(default)]
    pub bypass_login: Option<String>,
    /// Reloads the employee behind every token, so deactivation and role or
    /// unit changes apply before the token expires.
    #[serde(default = "default_recheck_employee")]
    pub recheck_employee: bool,
}

/// Calendar rules used to date movements and bucket reports.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportRules {
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub week_start: WeekStart,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CashRules {
    #[serde(default = "default_max_movement")]
    pub max_movement_cents: i64,
    /// Upper bound for an opening float or a counted drawer.
    #[serde(default = "default_max_drawer")]
    pub max_drawer_cents: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_seconds: default_jwt_ttl(),
            developer_credential: String::new(),
            bypass_auth: false,
            bypass_login: None,
            recheck_employee: default_recheck_employee(),
        }
    }
}

impl Default for ReportRules {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset(),
            week_start: WeekStart::default(),
        }
    }
}

impl Default for CashRules {
    fn default() -> Self {
        Self {
            max_movement_cents: default_max_movement(),
            max_drawer_cents: default_max_drawer(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("CAIXA").separator("__"));
        let cfg = builder.build()?;
        let mut config: Config = cfg.try_deserialize()?;

        if config.database.url.trim().is_empty() {
            let database_url = match env::var("CAIXA__DATABASE__URL") {
                Ok(url) if !url.trim().is_empty() => url,
                _ => match env::var("DATABASE_URL") {
                    Ok(url) if !url.trim().is_empty() => url,
                    _ => {
                        return Err(config::ConfigError::Message(
                            "Missing database URL. Set CAIXA__DATABASE__URL or DATABASE_URL."
                                .into(),
                        ));
                    }
                },
            };

            config.database.url = database_url;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    pub fn jwt_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.jwt_ttl_seconds)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_pool_max() -> u32 {
    10
}

fn default_jwt_ttl() -> u64 {
    60 * 60 * 8
}

fn default_recheck_employee() -> bool {
    true
}

/// Brasília time, UTC-03:00.
fn default_utc_offset() -> i32 {
    -180
}

fn default_max_movement() -> i64 {
    10_000_000
}

fn default_max_drawer() -> i64 {
    100_000_000
}
