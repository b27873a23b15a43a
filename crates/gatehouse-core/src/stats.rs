//! Read-only rollups over the scan log and the ticket ledger.
//!
//! No invariant is maintained here — the statistics are derived, never
//! stored. The one contract (tested against the store backends) is that the
//! counts match the ledger exactly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-category sales snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStatistics {
  pub category_id: Uuid,
  pub name:        String,
  pub capacity:    u32,
  pub sold:        u32,
  pub remaining:   u32,
}

/// The rollup returned by [`crate::store::ClubStore::summarize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStatistics {
  pub event_id:           Uuid,
  /// Every scan-log line for this event, whatever its outcome.
  pub total_scans:        u64,
  pub successful_scans:   u64,
  pub already_scanned:    u64,
  /// Denials other than a malformed code: blocked, inactive subscription,
  /// missing member, unavailable event, no ticket.
  pub denied_scans:       u64,
  pub invalid_scans:      u64,
  /// Σ quantity over every allocated purchase, paid or pending.
  pub tickets_sold:       u64,
  pub tickets_checked_in: u64,
  pub revenue_cents:      i64,
  /// Ticketless attendance ledger rows.
  pub attendance_count:   u64,
  pub categories:         Vec<CategoryStatistics>,
}
