//! Handler for `/events/:id/stats`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use gatehouse_core::{stats::EventStatistics, store::ClubStore};
use gatehouse_engine::Tally;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /events/:id/stats` — 404 if the event does not exist.
pub async fn event_stats<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<EventStatistics>, ApiError>
where
  S: ClubStore + Send + Sync + 'static,
{
  store
    .get_event(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;

  let stats = Tally::new(store).summarize(id).await?;
  Ok(Json(stats))
}
