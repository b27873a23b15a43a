//! JSON REST API for Gatehouse.
//!
//! Exposes an axum [`Router`] backed by any
//! [`gatehouse_core::store::ClubStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gatehouse_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod purchases;
pub mod scans;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gatehouse_core::store::ClubStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ClubStore + Send + Sync + 'static,
{
  Router::new()
    // Scans
    .route("/scans", post(scans::resolve::<S>))
    .route("/scans/recent", get(scans::recent::<S>))
    // Purchases
    .route("/purchases", post(purchases::create::<S>))
    .route("/purchases/{id}", get(purchases::get_one::<S>))
    .route("/purchases/{id}/payment", post(purchases::confirm_payment::<S>))
    // Statistics
    .route("/events/{id}/stats", get(stats::event_stats::<S>))
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────
