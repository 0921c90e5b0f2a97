// store/src/services/payment_mock.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result};
use crate::services::gateway::{InitializeRequest, PaymentGateway, PaymentSession};

/// Local stand-in for the hosted gateway. Sends customers to
/// `{base_url}/mock-pay/{reference}` and remembers every request.
pub struct MockGateway {
  base_url: String,
  latency: Duration,
  unavailable: AtomicBool,
  requests: Mutex<Vec<InitializeRequest>>,
}

impl MockGateway {
  pub fn new(base_url: &str) -> Self {
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      latency: Duration::from_millis(20),
      unavailable: AtomicBool::new(false),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn with_latency(mut self, latency: Duration) -> Self {
    self.latency = latency;
    self
  }

  /// While set, every initialize call fails as an upstream outage.
  pub fn set_unavailable(&self, unavailable: bool) {
    self.unavailable.store(unavailable, Ordering::SeqCst);
  }

  pub fn requests(&self) -> Vec<InitializeRequest> {
    self.requests.lock().clone()
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  fn name(&self) -> &str {
    "mock"
  }

  #[instrument(name = "gateway::mock_initialize", skip(self, request), fields(reference = %request.reference, amount = request.amount))]
  async fn initialize(&self, request: &InitializeRequest) -> Result<PaymentSession> {
    tokio::time::sleep(self.latency).await; // Simulate network latency

    if self.unavailable.load(Ordering::SeqCst) {
      warn!("Mock gateway is unavailable; failing initialize.");
      return Err(AppError::upstream("mock gateway unavailable"));
    }
    if request.amount <= 0 {
      return Err(AppError::upstream("amount must be greater than zero"));
    }

    self.requests.lock().push(request.clone());
    let session = PaymentSession {
      redirect_url: format!("{}/mock-pay/{}", self.base_url, request.reference),
      provider_reference: request.reference.clone(),
      access_code: Some(format!("mock_ac_{}", uuid::Uuid::new_v4().simple())),
    };
    info!(redirect_url = %session.redirect_url, "Mock payment session created.");
    Ok(session)
  }
}
