// store/src/services/references.rs

use rand_core::{OsRng, RngCore};
use uuid::Uuid;

const TRACKING_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TRACKING_LEN: usize = 12;

/// `TX-` followed by a v4 UUID in uppercase simple form.
pub fn transaction_ref() -> String {
  format!("TX-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// `TRK-` followed by 12 uppercase alphanumerics.
pub fn tracking_id() -> String {
  let mut out = String::with_capacity(4 + TRACKING_LEN);
  out.push_str("TRK-");
  let mut buf = [0u8; 32];
  while out.len() < 4 + TRACKING_LEN {
    OsRng.fill_bytes(&mut buf);
    // 252 = 7 * 36; larger bytes would bias the alphabet.
    for byte in buf.iter().copied().filter(|b| *b < 252) {
      if out.len() == 4 + TRACKING_LEN {
        break;
      }
      out.push(TRACKING_ALPHABET[(byte % 36) as usize] as char);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn transaction_refs_are_unique_and_well_formed() {
    let a = transaction_ref();
    let b = transaction_ref();
    assert_ne!(a, b);
    assert!(a.starts_with("TX-"));
    assert_eq!(a.len(), 3 + 32);
    assert!(a[3..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
  }

  #[test]
  fn tracking_ids_are_well_formed() {
    let id = tracking_id();
    assert!(id.starts_with("TRK-"));
    assert_eq!(id.len(), 16);
    assert!(id[4..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
  }
}
