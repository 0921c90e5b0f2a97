// store/src/config.rs

use crate::errors::{AppError, Result};
use crate::pricing::PricingPolicy;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Postgres,
  Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
  Live,
  Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub store_backend: StoreBackend,
  pub database_url: Option<String>,
  pub db_max_connections: u32,

  pub app_base_url: String,
  pub frontend_url: String,

  pub gateway_mode: GatewayMode,
  pub gateway_base_url: String,
  pub gateway_secret_key: String,
  pub webhook_secret: String,
  pub gateway_timeout: Duration,
  pub currency: String,

  pub pricing: PricingPolicy,

  pub operator_api_key: String,
  pub log_format: LogFormat,
}

// Secrets stay out of logs.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("store_backend", &self.store_backend)
      .field("db_max_connections", &self.db_max_connections)
      .field("app_base_url", &self.app_base_url)
      .field("frontend_url", &self.frontend_url)
      .field("gateway_mode", &self.gateway_mode)
      .field("gateway_base_url", &self.gateway_base_url)
      .field("gateway_timeout", &self.gateway_timeout)
      .field("currency", &self.currency)
      .field("pricing", &self.pricing)
      .field("log_format", &self.log_format)
      .finish_non_exhaustive()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the configuration from any key lookup. Empty values count as unset.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let require = |key: &str| get(key).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", key)));

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(get("SERVER_PORT"), "SERVER_PORT", 8080u16)?;

    let store_backend = match get("STORE_BACKEND").as_deref().unwrap_or("postgres") {
      "postgres" => StoreBackend::Postgres,
      "memory" => StoreBackend::Memory,
      other => return Err(AppError::Config(format!("Invalid STORE_BACKEND '{}'", other))),
    };
    let database_url = get("DATABASE_URL");
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (required for STORE_BACKEND=postgres)".to_string(),
      ));
    }
    let db_max_connections = parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10u32)?;

    let app_base_url = get("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));
    let frontend_url = get("FRONTEND_URL").unwrap_or_else(|| app_base_url.clone());

    let gateway_mode = match get("GATEWAY_MODE").as_deref().unwrap_or("live") {
      "live" => GatewayMode::Live,
      "mock" => GatewayMode::Mock,
      other => return Err(AppError::Config(format!("Invalid GATEWAY_MODE '{}'", other))),
    };
    let gateway_base_url = get("GATEWAY_BASE_URL").unwrap_or_else(|| "https://api.paystack.co".to_string());
    let gateway_secret_key = require("GATEWAY_SECRET_KEY")?;
    let webhook_secret = get("WEBHOOK_SECRET").unwrap_or_else(|| gateway_secret_key.clone());
    let gateway_timeout = Duration::from_secs(parse_or(get("GATEWAY_TIMEOUT_SECS"), "GATEWAY_TIMEOUT_SECS", 15u64)?);
    let currency = get("CURRENCY").unwrap_or_else(|| "NGN".to_string());

    let pricing = PricingPolicy {
      tax_rate: parse_or(get("TAX_RATE"), "TAX_RATE", Decimal::new(75, 3))?,
      free_shipping_threshold: parse_or(get("FREE_SHIPPING_THRESHOLD"), "FREE_SHIPPING_THRESHOLD", Decimal::from(50000))?,
      default_shipping_fee: parse_or(get("DEFAULT_SHIPPING_FEE"), "DEFAULT_SHIPPING_FEE", Decimal::from(3500))?,
    };
    if pricing.tax_rate.is_sign_negative()
      || pricing.free_shipping_threshold.is_sign_negative()
      || pricing.default_shipping_fee.is_sign_negative()
    {
      return Err(AppError::Config("Pricing settings must not be negative".to_string()));
    }

    let operator_api_key = require("OPERATOR_API_KEY")?;
    let log_format = match get("LOG_FORMAT").as_deref().unwrap_or("text") {
      "text" => LogFormat::Text,
      "json" => LogFormat::Json,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    let config = Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      db_max_connections,
      app_base_url,
      frontend_url,
      gateway_mode,
      gateway_base_url,
      gateway_secret_key,
      webhook_secret,
      gateway_timeout,
      currency,
      pricing,
      operator_api_key,
      log_format,
    };
    tracing::info!(config = ?config, "Application configuration loaded successfully.");
    Ok(config)
  }

  /// Where the gateway sends the customer after the hosted payment page.
  pub fn payment_callback_url(&self) -> String {
    format!(
      "{}/cart/checkout/payment-verification",
      self.frontend_url.trim_end_matches('/')
    )
  }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
  }
}
