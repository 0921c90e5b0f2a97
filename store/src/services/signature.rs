// store/src/services/signature.rs

//! HMAC-SHA512 webhook signatures: lowercase hex over the raw request body.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::errors::{AppError, Result};

type HmacSha512 = Hmac<Sha512>;

fn mac_for(secret: &str) -> Result<HmacSha512> {
  HmacSha512::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))
}

pub fn sign(secret: &str, payload: &[u8]) -> Result<String> {
  let mut mac = mac_for(secret)?;
  mac.update(payload);
  Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against the body. Hex case is ignored and the digest
/// comparison is constant-time.
pub fn verify(secret: &str, payload: &[u8], signature: Option<&str>) -> Result<()> {
  let signature = signature
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .ok_or_else(|| AppError::Signature("missing signature header".to_string()))?;
  let provided = hex::decode(signature).map_err(|_| AppError::Signature("signature is not valid hex".to_string()))?;

  let mut mac = mac_for(secret)?;
  mac.update(payload);
  mac
    .verify_slice(&provided)
    .map_err(|_| AppError::Signature("signature mismatch".to_string()))
}
