//! Error type for `gatehouse-token`.

use thiserror::Error;

/// Why a scanned token failed to decode. Both variants are rendered as the
/// same `invalid_code` outcome at the gate; they are distinguished here for
/// logging.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("token does not start with the gatehouse namespace prefix")]
  MissingPrefix,

  #[error("token has no member reference after the prefix")]
  EmptyReference,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
