use serde::Deserialize;
use std::env;
use std::time::Duration;
use triplicity_core::notify::DispatcherConfig;
use triplicity_shared::Masked;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
    pub mail: MailConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    pub booking: BookingSettings,
    #[serde(default)]
    pub accounts: AccountsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Requests per client IP per minute. Only enforced when Redis is configured.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_rate_limit() -> i64 { 120 }

/// No URL means the service runs on in-memory stores.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<Masked<String>>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Masked<String>,
    pub jwt_expiration_seconds: u64,
    /// Accounts with these emails get the admin role at login
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    Mock,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub provider: PaymentProvider,
    pub secret_key: Option<Masked<String>>,
    pub publishable_key: Option<String>,
    pub webhook_secret: Option<Masked<String>>,
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_seconds: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_payment_timeout")]
    pub timeout_seconds: u64,
}

fn default_webhook_tolerance() -> i64 { 300 }
fn default_currency() -> String { "inr".to_string() }
fn default_api_base() -> String { "https://api.stripe.com".to_string() }
fn default_payment_timeout() -> u64 { 10 }

impl PaymentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    Smtp,
    Log,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<Masked<String>>,
    pub from: String,
}

fn default_smtp_port() -> u16 { 587 }
fn default_true() -> bool { true }

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub queue_capacity: usize,
    pub workers: usize,
    pub send_timeout_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            workers: 4,
            send_timeout_seconds: 30,
        }
    }
}

impl NotificationConfig {
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            queue_capacity: self.queue_capacity,
            workers: self.workers,
            send_timeout: Duration::from_secs(self.send_timeout_seconds),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingSettings {
    pub brand_name: String,
    pub reconcile_interval_seconds: u64,
    pub reconcile_batch_size: i64,
    pub max_intent_attempts: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountsSettings {
    pub verification_code_ttl_seconds: i64,
}

impl Default for AccountsSettings {
    fn default() -> Self {
        Self {
            verification_code_ttl_seconds: 600,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `TRIPLICITY_DATABASE__URL=postgres://...`
            .add_source(
                config::Environment::with_prefix("TRIPLICITY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_emails")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Parses a single TOML document. No files or environment are consulted.
    pub fn from_toml(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
