// store/src/main.rs

use kobo_store::config::{AppConfig, GatewayMode, LogFormat, StoreBackend};
use kobo_store::services::{HttpGateway, MockGateway, PaymentGateway};
use kobo_store::state::AppState;
use kobo_store::store::{MemoryStore, PgStore, Store};
use kobo_store::web::configure_app_routes;

use actix_web::{web as actix_data, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
  tracing::error!(error = %e, "{}", context);
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

async fn build_store(config: &AppConfig) -> io::Result<Arc<dyn Store>> {
  match config.store_backend {
    StoreBackend::Postgres => {
      let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| startup_error("Store backend misconfigured", "DATABASE_URL is not set"))?;
      let store = PgStore::connect(url, config.db_max_connections, &config.currency)
        .await
        .map_err(|e| startup_error("Failed to connect to the database", e))?;
      tracing::info!("Connected to the database and applied migrations.");
      Ok(Arc::new(store))
    }
    StoreBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on restart.");
      Ok(Arc::new(MemoryStore::new(&config.currency)))
    }
  }
}

fn build_gateway(config: &AppConfig) -> io::Result<Arc<dyn PaymentGateway>> {
  match config.gateway_mode {
    GatewayMode::Live => {
      let gateway = HttpGateway::new(&config.gateway_base_url, &config.gateway_secret_key, config.gateway_timeout)
        .map_err(|e| startup_error("Failed to build the payment gateway client", e))?;
      Ok(Arc::new(gateway))
    }
    GatewayMode::Mock => {
      tracing::warn!("Using the mock payment gateway.");
      Ok(Arc::new(MockGateway::new(&config.app_base_url)))
    }
  }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  // The log format is itself configuration, so peek at it before anything logs.
  let log_format = match std::env::var("LOG_FORMAT").ok().as_deref() {
    Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
    _ => LogFormat::Text,
  };
  init_tracing(log_format);
  tracing::info!("Starting store server...");

  let app_config = Arc::new(AppConfig::from_env().map_err(|e| startup_error("Failed to load configuration", e))?);

  let store = build_store(&app_config).await?;
  let gateway = build_gateway(&app_config)?;
  let app_state = AppState::new(store, gateway.clone(), app_config.clone());
  tracing::info!(gateway = gateway.name(), "Flows registered.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
