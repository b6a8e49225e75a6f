use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

/// Development-only signing secret; `main` warns when it is still in use.
pub const DEFAULT_JWT_SECRET: &str = "mysecretkey";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Where checkout success/cancel redirects and reset links point.
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StripeConfig {
    #[serde(default)]
    pub enabled: bool,
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    #[serde(default = "default_bronze_price")]
    pub bronze_price_id: String,
    #[serde(default = "default_gold_price")]
    pub gold_price_id: String,
    #[serde(default = "default_platinum_price")]
    pub platinum_price_id: String,
}

fn default_bronze_price() -> String {
    "price_bronze_499".to_string()
}

fn default_gold_price() -> String {
    "price_gold_1299".to_string()
}

fn default_platinum_price() -> String {
    "price_platinum_2999".to_string()
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret_key: None,
            webhook_secret: None,
            bronze_price_id: default_bronze_price(),
            gold_price_id: default_gold_price(),
            platinum_price_id: default_platinum_price(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    /// Recipient for contact-form notifications.
    pub admin_address: Option<String>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.frontend_url", "http://localhost:3000")?
            .set_default("database.url", "sqlite://fitmat.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("auth.token_ttl_hours", 1)?
            .set_default("auth.reset_token_ttl_minutes", 60)?
            .set_default("stripe.enabled", false)?
            .set_default("uploads.max_file_size", 10 * 1024 * 1024)?
            .set_default("email.enabled", false)?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with FITMAT__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("FITMAT").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://fitmat.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                token_ttl_hours: 1,
                reset_token_ttl_minutes: 60,
            },
            stripe: StripeConfig::default(),
            uploads: UploadConfig::default(),
            email: EmailConfig::default(),
        }
    }
}
