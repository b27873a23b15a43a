//! Scan-token codec for Gatehouse.
//!
//! Converts between the text a scanner produces and a
//! [`MemberRef`]. Pure synchronous; no HTTP or database dependencies. Every
//! other component is isolated from the wire representation of a scanned
//! code — how the text was acquired (camera decode, uploaded image) is the
//! caller's business.
//!
//! # Quick start
//!
//! ```
//! use gatehouse_core::MemberRef;
//!
//! let token = gatehouse_token::encode(&MemberRef::new("acct-8842"));
//! assert_eq!(token, "GATEHOUSE:acct-8842");
//! assert_eq!(gatehouse_token::decode(&token).unwrap(), MemberRef::new("acct-8842"));
//! ```

pub mod error;

pub use error::{Error, Result};
use gatehouse_core::MemberRef;

/// Fixed, case-sensitive token prefix. Anything not starting with
/// `"GATEHOUSE:"` is rejected.
pub const NAMESPACE: &str = "GATEHOUSE";

/// Render `member` as a scannable token: `"GATEHOUSE:" + reference`.
pub fn encode(member: &MemberRef) -> String {
  format!("{NAMESPACE}:{member}")
}

/// Parse a scanned token back into a [`MemberRef`].
///
/// Strips the namespace prefix and surrounding whitespace from the
/// remainder. Rejects tokens without the exact prefix and tokens whose
/// remainder is empty after trimming.
pub fn decode(token: &str) -> Result<MemberRef> {
  let rest = token
    .strip_prefix(NAMESPACE)
    .and_then(|rest| rest.strip_prefix(':'))
    .ok_or(Error::MissingPrefix)?;

  let reference = rest.trim();
  if reference.is_empty() {
    return Err(Error::EmptyReference);
  }

  Ok(MemberRef::new(reference))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip() {
    for reference in ["acct-1", "8842", "member/with/slashes", "αβγ"] {
      let member = MemberRef::new(reference);
      assert_eq!(decode(&encode(&member)).unwrap(), member);
    }
  }

  #[test]
  fn wrong_prefix_is_rejected() {
    assert!(matches!(decode("WRONGPREFIX:abc123"), Err(Error::MissingPrefix)));
    assert!(matches!(decode("abc123"), Err(Error::MissingPrefix)));
    assert!(matches!(decode(""), Err(Error::MissingPrefix)));
  }

  #[test]
  fn prefix_is_case_sensitive() {
    assert!(matches!(decode("gatehouse:abc123"), Err(Error::MissingPrefix)));
    assert!(matches!(decode("Gatehouse:abc123"), Err(Error::MissingPrefix)));
  }

  #[test]
  fn empty_or_whitespace_remainder_is_rejected() {
    assert!(matches!(decode("GATEHOUSE:"), Err(Error::EmptyReference)));
    assert!(matches!(decode("GATEHOUSE:   "), Err(Error::EmptyReference)));
    assert!(matches!(decode("GATEHOUSE:\t\n"), Err(Error::EmptyReference)));
  }

  #[test]
  fn remainder_is_trimmed() {
    assert_eq!(
      decode("GATEHOUSE:  acct-7  ").unwrap(),
      MemberRef::new("acct-7")
    );
  }
}
