//! Events and their capacity-bounded ticket categories.
//!
//! Events and categories are created and edited by the admin back-office (out
//! of scope here); the engine reads their activation/time fields and mutates
//! only the counters — `sold` through [`crate::store::ClubStore::allocate`]
//! and the aggregates through the same transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Event ───────────────────────────────────────────────────────────────────

/// A club event that gates can scan against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_id:   Uuid,
  pub title:      String,
  pub active:     bool,
  pub starts_at:  DateTime<Utc>,
  pub ends_at:    DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}

impl Event {
  /// Whether gate scans are admitted at `now`. The doors may open before
  /// `starts_at`; scanning stops once the event has ended.
  pub fn is_open(&self, now: DateTime<Utc>) -> bool {
    self.active && now <= self.ends_at
  }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Per-event counters on a dedicated record, so the allocator and the
/// check-in path increment them without ever patching the event itself.
/// Mutated exclusively inside allocate/check-in transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAggregates {
  pub event_id:            Uuid,
  pub total_sold:          u32,
  pub total_revenue_cents: i64,
  pub total_checked_in:    u32,
}

impl EventAggregates {
  /// The zeroed row an event starts with.
  pub fn empty(event_id: Uuid) -> Self {
    Self {
      event_id,
      total_sold: 0,
      total_revenue_cents: 0,
      total_checked_in: 0,
    }
  }
}

// ─── TicketCategory ──────────────────────────────────────────────────────────

/// A capacity-bounded class of tickets for one event.
///
/// Invariant: `0 <= sold <= capacity` at all times, even under concurrent
/// writers. `sold` is monotonically non-decreasing and is mutated only by
/// [`crate::store::ClubStore::allocate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCategory {
  pub category_id:    Uuid,
  pub event_id:       Uuid,
  pub name:           String,
  pub price_cents:    i64,
  pub capacity:       u32,
  pub sold:           u32,
  pub active:         bool,
  /// Only buyers with a current membership may purchase.
  pub members_only:   bool,
  pub sales_open_at:  Option<DateTime<Utc>>,
  pub sales_close_at: Option<DateTime<Utc>>,
}

impl TicketCategory {
  /// Whether the category accepts purchases at `now`: it must be active and
  /// `now` must fall inside the sales window (either bound may be absent).
  pub fn on_sale(&self, now: DateTime<Utc>) -> bool {
    self.active
      && self.sales_open_at.is_none_or(|open| open <= now)
      && self.sales_close_at.is_none_or(|close| now <= close)
  }

  pub fn remaining(&self) -> u32 { self.capacity.saturating_sub(self.sold) }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};

  use super::*;

  fn category(active: bool) -> TicketCategory {
    TicketCategory {
      category_id: Uuid::new_v4(),
      event_id: Uuid::new_v4(),
      name: "General".into(),
      price_cents: 2500,
      capacity: 100,
      sold: 40,
      active,
      members_only: false,
      sales_open_at: None,
      sales_close_at: None,
    }
  }

  #[test]
  fn unbounded_window_is_on_sale_while_active() {
    assert!(category(true).on_sale(Utc::now()));
    assert!(!category(false).on_sale(Utc::now()));
  }

  #[test]
  fn window_bounds_are_inclusive() {
    let now = Utc::now();
    let mut c = category(true);
    c.sales_open_at = Some(now);
    c.sales_close_at = Some(now);
    assert!(c.on_sale(now));
    assert!(!c.on_sale(now + Duration::seconds(1)));
    assert!(!c.on_sale(now - Duration::seconds(1)));
  }

  #[test]
  fn remaining_never_underflows() {
    let mut c = category(true);
    c.sold = c.capacity;
    assert_eq!(c.remaining(), 0);
  }

  #[test]
  fn event_closes_after_end() {
    let now = Utc::now();
    let event = Event {
      event_id: Uuid::new_v4(),
      title: "Summer Social".into(),
      active: true,
      starts_at: now + Duration::hours(2),
      ends_at: now + Duration::hours(6),
      created_at: now,
    };
    // Doors may open before the start instant.
    assert!(event.is_open(now));
    assert!(!event.is_open(now + Duration::hours(7)));
  }
}
