//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gatehouse_engine::{Error as EngineError, PurchaseError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Purchase denials (`SoldOut`, `CategoryUnavailable`) get their own variants
/// so they map to distinct status codes; scan denials never reach this type —
/// they ride inside a 200 `ScanResult`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("sold out: {sold} of {capacity} already allocated")]
  SoldOut { sold: u32, capacity: u32 },

  #[error("ticket category unavailable")]
  CategoryUnavailable,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::SoldOut { .. } => (StatusCode::CONFLICT, self.to_string()),
      ApiError::CategoryUnavailable => {
        (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
      }
      // Deliberately generic: a store fault must read as "try again", never
      // as an access refusal.
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed on the store");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "temporary system error, please retry".to_string(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

impl From<EngineError> for ApiError {
  fn from(e: EngineError) -> Self {
    match e {
      EngineError::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl From<PurchaseError> for ApiError {
  fn from(e: PurchaseError) -> Self {
    match e {
      PurchaseError::SoldOut { sold, capacity } => ApiError::SoldOut { sold, capacity },
      PurchaseError::CategoryUnavailable => ApiError::CategoryUnavailable,
      PurchaseError::RetriesExhausted => ApiError::Store(Box::new(e)),
      PurchaseError::Store(inner) => ApiError::Store(inner),
    }
  }
}
