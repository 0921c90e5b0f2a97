// store/src/web/extractors.rs

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Customer identity set by the session layer in front of this service.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let user_id = req
      .headers()
      .get("X-User-ID")
      .and_then(|v| v.to_str().ok())
      .and_then(|v| Uuid::parse_str(v.trim()).ok());
    match user_id {
      Some(user_id) => ready(Ok(AuthenticatedUser { user_id })),
      None => {
        warn!("AuthenticatedUser extractor: missing or invalid X-User-ID header.");
        ready(Err(AppError::Auth("User authentication required".to_string())))
      }
    }
  }
}

/// Recorded as the actor of operator actions. Never derived from the key.
pub const OPERATOR_LABEL: &str = "operator";

/// An operator allowed to move orders through fulfillment.
#[derive(Debug, Clone)]
pub struct Operator {
  pub label: String,
}

fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
  provided.len() == expected.len() && provided.iter().zip(expected).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

impl FromRequest for Operator {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let Some(app_state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("Application state not configured".to_string())));
    };
    let provided = req.headers().get("X-Operator-Key").and_then(|v| v.to_str().ok());
    let result = match provided {
      None => Err(AppError::Auth("Operator key required".to_string())),
      Some(key) if keys_match(key.as_bytes(), app_state.config.operator_api_key.as_bytes()) => Ok(Operator {
        label: OPERATOR_LABEL.to_string(),
      }),
      Some(_) => {
        warn!(target: "security", path = %req.path(), "Rejected request with wrong operator key.");
        Err(AppError::Forbidden("Operator key is not valid".to_string()))
      }
    };
    ready(result)
  }
}
