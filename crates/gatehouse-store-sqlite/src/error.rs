//! Error type for `gatehouse-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A TEXT status column held a value no enum variant claims.
  #[error("unknown discriminant: {0:?}")]
  Discriminant(String),

  /// Targeted a check-in or payment transition at a purchase that does not
  /// exist.
  #[error("ticket purchase not found: {0}")]
  PurchaseNotFound(Uuid),

  #[error("event not found: {0}")]
  EventNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
