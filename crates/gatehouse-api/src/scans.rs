//! Handlers for `/scans` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/scans` | Body: [`ScanBody`]; always 200 with a [`ScanResult`] — denials are results, not errors |
//! | `GET`  | `/scans/recent` | Optional `?event_id=<id>&limit=<n>`; newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use gatehouse_core::{
  scan::{ScanMode, ScanRecord, ScanResult},
  store::ClubStore,
};
use gatehouse_engine::Gatekeeper;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Resolve ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /scans`. The mode tag and its `event_id` are
/// flattened into the top level:
/// `{"token":"…","operator_id":"…","mode":"event_with_ticket","event_id":"…"}`.
#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub token:       String,
  pub operator_id: String,
  #[serde(flatten)]
  pub mode:        ScanMode,
}

/// `POST /scans` — resolve a scanned token into an access decision.
pub async fn resolve<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<ScanBody>,
) -> Result<Json<ScanResult>, ApiError>
where
  S: ClubStore + Send + Sync + 'static,
{
  let result = Gatekeeper::new(store)
    .resolve(&body.token, body.mode, &body.operator_id)
    .await?;
  Ok(Json(result))
}

// ─── Recent feed ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub event_id: Option<Uuid>,
  /// Defaults to 50.
  pub limit:    Option<usize>,
}

/// `GET /scans/recent[?event_id=<id>][&limit=<n>]`
pub async fn recent<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<ScanRecord>>, ApiError>
where
  S: ClubStore,
{
  let scans = store
    .recent_scans(params.event_id, params.limit.unwrap_or(50))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(scans))
}
