//! Engine error types.
//!
//! Denial outcomes never appear here. A scan denial is a
//! [`gatehouse_core::scan::ScanStatus`] inside a successful result; a
//! purchase denial is one of the typed [`PurchaseError`] variants. The
//! `Store` variants are genuine system faults: callers must render them
//! generically and retry, never as an access refusal.

use thiserror::Error;

/// A non-decision failure while resolving a scan or summarizing an event.
#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Why a purchase did not produce a ticket.
#[derive(Debug, Error)]
pub enum PurchaseError {
  /// Remaining capacity cannot cover the requested quantity. The request
  /// fails entirely; partial allocation is never performed.
  #[error("sold out: {sold} of {capacity} already allocated")]
  SoldOut { sold: u32, capacity: u32 },

  /// Category missing, inactive, outside its sales window, mismatched with
  /// the event, restricted to members, or the quantity was zero.
  #[error("ticket category unavailable")]
  CategoryUnavailable,

  /// Allocation kept colliding or conflicting past the retry bound.
  /// A system fault, not a denial.
  #[error("allocation retries exhausted")]
  RetriesExhausted,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}
