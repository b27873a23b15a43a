//! Handlers for `/purchases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/purchases` | Body: [`PurchaseBody`]; 201, or 409 (sold out) / 422 (unavailable) |
//! | `GET`  | `/purchases/:id` | 404 if not found |
//! | `POST` | `/purchases/:id/payment` | Payment-callback seam: marks the purchase paid |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use gatehouse_core::{MemberRef, store::ClubStore, ticket::TicketPurchase};
use gatehouse_engine::{BoxOffice, PurchaseRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /purchases`.
#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
  pub event_id:    Uuid,
  pub category_id: Uuid,
  pub member:      MemberRef,
  pub quantity:    u32,
}

/// `POST /purchases` — returns 201 + the allocated
/// [`TicketPurchase`] (payment still pending).
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<PurchaseBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ClubStore + Send + Sync + 'static,
{
  let purchase = BoxOffice::new(store)
    .purchase(PurchaseRequest {
      event_id:    body.event_id,
      category_id: body.category_id,
      buyer:       body.member,
      quantity:    body.quantity,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(purchase)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /purchases/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TicketPurchase>, ApiError>
where
  S: ClubStore,
{
  let purchase = store
    .get_purchase(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("purchase {id} not found")))?;
  Ok(Json(purchase))
}

// ─── Payment callback ─────────────────────────────────────────────────────────

/// `POST /purchases/:id/payment` — the seam the (external) payment provider
/// callback lands on. Transitions the purchase to `paid`.
pub async fn confirm_payment<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TicketPurchase>, ApiError>
where
  S: ClubStore,
{
  let purchase = store
    .mark_purchase_paid(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("purchase {id} not found")))?;
  Ok(Json(purchase))
}
