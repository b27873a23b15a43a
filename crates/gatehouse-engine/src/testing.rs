//! In-memory [`ClubStore`] and seed helpers for engine tests.
//!
//! A `HashMap` behind a mutex is enough to satisfy the store contract: every
//! conditional write runs entirely under the lock, so it is atomic with
//! respect to other store calls. Knobs exist to simulate an unavailable
//! backend and transaction conflicts, which the real SQLite backend cannot
//! produce on demand.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::{Duration, Utc};
use gatehouse_core::{
  event::{Event, EventAggregates, TicketCategory},
  member::{MemberRef, Membership, MembershipStatus, PlanKind},
  scan::{NewScanRecord, ScanRecord, ScanStatus},
  stats::{CategoryStatistics, EventStatistics},
  store::{
    AllocationOutcome, AttendanceOutcome, CheckInOutcome, ClubStore, NewPurchase,
  },
  ticket::{AttendanceRecord, PaymentStatus, TicketPurchase},
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  #[error("memory store unavailable")]
  Unavailable,

  #[error("purchase not found: {0}")]
  PurchaseNotFound(Uuid),

  #[error("event not found: {0}")]
  EventNotFound(Uuid),
}

#[derive(Default)]
struct State {
  memberships: HashMap<String, Membership>,
  events:      HashMap<Uuid, Event>,
  aggregates:  HashMap<Uuid, EventAggregates>,
  categories:  HashMap<Uuid, TicketCategory>,
  purchases:   HashMap<Uuid, TicketPurchase>,
  attendance:  HashMap<(String, Uuid), AttendanceRecord>,
  scans:       Vec<ScanRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
  state:     Mutex<State>,
  fail:      AtomicBool,
  conflicts: AtomicUsize,
}

impl MemoryStore {
  /// Every subsequent call fails with [`MemoryStoreError::Unavailable`].
  pub fn fail_from_now_on(&self) { self.fail.store(true, Ordering::SeqCst); }

  /// The next `n` allocate calls report [`AllocationOutcome::Conflict`].
  pub fn conflict_next_allocations(&self, n: usize) {
    self.conflicts.store(n, Ordering::SeqCst);
  }

  pub async fn attendance_count(&self) -> usize {
    self.state.lock().unwrap().attendance.len()
  }

  fn check_available(&self) -> Result<(), MemoryStoreError> {
    if self.fail.load(Ordering::SeqCst) {
      Err(MemoryStoreError::Unavailable)
    } else {
      Ok(())
    }
  }
}

impl ClubStore for MemoryStore {
  type Error = MemoryStoreError;

  // ── Memberships ───────────────────────────────────────────────────────

  async fn put_membership(&self, membership: Membership) -> Result<(), MemoryStoreError> {
    self.check_available()?;
    let mut state = self.state.lock().unwrap();
    state
      .memberships
      .insert(membership.member.as_str().to_owned(), membership);
    Ok(())
  }

  async fn get_membership(
    &self,
    member: &MemberRef,
  ) -> Result<Option<Membership>, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    Ok(state.memberships.get(member.as_str()).cloned())
  }

  // ── Events & categories ───────────────────────────────────────────────

  async fn put_event(&self, event: Event) -> Result<(), MemoryStoreError> {
    self.check_available()?;
    let mut state = self.state.lock().unwrap();
    state
      .aggregates
      .entry(event.event_id)
      .or_insert_with(|| EventAggregates::empty(event.event_id));
    state.events.insert(event.event_id, event);
    Ok(())
  }

  async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, MemoryStoreError> {
    self.check_available()?;
    Ok(self.state.lock().unwrap().events.get(&event_id).cloned())
  }

  async fn put_category(&self, category: TicketCategory) -> Result<(), MemoryStoreError> {
    self.check_available()?;
    let mut state = self.state.lock().unwrap();
    // `sold` on an existing row belongs to allocate; preserve it.
    let sold = state
      .categories
      .get(&category.category_id)
      .map_or(category.sold, |existing| existing.sold);
    let mut category = category;
    category.sold = sold;
    state.categories.insert(category.category_id, category);
    Ok(())
  }

  async fn get_category(
    &self,
    category_id: Uuid,
  ) -> Result<Option<TicketCategory>, MemoryStoreError> {
    self.check_available()?;
    Ok(self.state.lock().unwrap().categories.get(&category_id).cloned())
  }

  async fn list_categories(
    &self,
    event_id: Uuid,
  ) -> Result<Vec<TicketCategory>, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .categories
        .values()
        .filter(|c| c.event_id == event_id)
        .cloned()
        .collect(),
    )
  }

  async fn get_event_aggregates(
    &self,
    event_id: Uuid,
  ) -> Result<EventAggregates, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .aggregates
        .get(&event_id)
        .cloned()
        .unwrap_or_else(|| EventAggregates::empty(event_id)),
    )
  }

  // ── Purchases ─────────────────────────────────────────────────────────

  async fn get_purchase(
    &self,
    purchase_id: Uuid,
  ) -> Result<Option<TicketPurchase>, MemoryStoreError> {
    self.check_available()?;
    Ok(self.state.lock().unwrap().purchases.get(&purchase_id).cloned())
  }

  async fn find_gate_purchase(
    &self,
    member: &MemberRef,
    event_id: Uuid,
  ) -> Result<Option<TicketPurchase>, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    let mut matching: Vec<&TicketPurchase> = state
      .purchases
      .values()
      .filter(|p| {
        p.member == *member
          && p.event_id == event_id
          && p.payment == PaymentStatus::Paid
      })
      .collect();
    matching.sort_by_key(|p| (p.checked_in, p.purchased_at));
    Ok(matching.first().map(|p| (*p).clone()))
  }

  async fn list_purchases(
    &self,
    event_id: Uuid,
  ) -> Result<Vec<TicketPurchase>, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .purchases
        .values()
        .filter(|p| p.event_id == event_id)
        .cloned()
        .collect(),
    )
  }

  async fn mark_purchase_paid(
    &self,
    purchase_id: Uuid,
  ) -> Result<Option<TicketPurchase>, MemoryStoreError> {
    self.check_available()?;
    let mut state = self.state.lock().unwrap();
    Ok(state.purchases.get_mut(&purchase_id).map(|p| {
      p.payment = PaymentStatus::Paid;
      p.clone()
    }))
  }

  // ── Conditional writes ────────────────────────────────────────────────

  async fn allocate(
    &self,
    input: NewPurchase,
  ) -> Result<AllocationOutcome, MemoryStoreError> {
    self.check_available()?;
    if self
      .conflicts
      .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
      .is_ok()
    {
      return Ok(AllocationOutcome::Conflict);
    }

    let mut state = self.state.lock().unwrap();
    if state
      .purchases
      .values()
      .any(|p| p.ticket_number == input.ticket_number)
    {
      return Ok(AllocationOutcome::NumberTaken);
    }

    let now = Utc::now();
    let (price_cents, sold, capacity) = match state.categories.get(&input.category_id) {
      Some(c) if c.event_id == input.event_id && c.on_sale(now) => {
        (c.price_cents, c.sold, c.capacity)
      }
      _ => return Ok(AllocationOutcome::Unavailable),
    };

    if sold + input.quantity > capacity {
      return Ok(AllocationOutcome::SoldOut { sold, capacity });
    }

    let amount_cents = price_cents * i64::from(input.quantity);
    let purchase = TicketPurchase {
      purchase_id: Uuid::new_v4(),
      member: input.member,
      event_id: input.event_id,
      category_id: input.category_id,
      quantity: input.quantity,
      ticket_number: input.ticket_number,
      amount_cents,
      payment: PaymentStatus::Pending,
      checked_in: false,
      checked_in_at: None,
      purchased_at: now,
    };

    let category = state.categories.get_mut(&input.category_id).unwrap();
    category.sold += input.quantity;
    let aggregates = state
      .aggregates
      .entry(input.event_id)
      .or_insert_with(|| EventAggregates::empty(input.event_id));
    aggregates.total_sold += input.quantity;
    aggregates.total_revenue_cents += amount_cents;

    state.purchases.insert(purchase.purchase_id, purchase.clone());
    Ok(AllocationOutcome::Allocated(purchase))
  }

  async fn check_in(
    &self,
    purchase_id: Uuid,
  ) -> Result<CheckInOutcome, MemoryStoreError> {
    self.check_available()?;
    let mut state = self.state.lock().unwrap();
    let event_id = {
      let purchase = state
        .purchases
        .get_mut(&purchase_id)
        .ok_or(MemoryStoreError::PurchaseNotFound(purchase_id))?;
      if purchase.checked_in {
        return Ok(CheckInOutcome::AlreadyCheckedIn(purchase.clone()));
      }
      purchase.checked_in = true;
      purchase.checked_in_at = Some(Utc::now());
      purchase.event_id
    };
    let snapshot = state.purchases[&purchase_id].clone();
    let aggregates = state
      .aggregates
      .entry(event_id)
      .or_insert_with(|| EventAggregates::empty(event_id));
    aggregates.total_checked_in += 1;
    Ok(CheckInOutcome::CheckedIn(snapshot))
  }

  async fn record_attendance(
    &self,
    member: &MemberRef,
    event_id: Uuid,
  ) -> Result<AttendanceOutcome, MemoryStoreError> {
    self.check_available()?;
    let mut state = self.state.lock().unwrap();
    let key = (member.as_str().to_owned(), event_id);
    if let Some(existing) = state.attendance.get(&key) {
      return Ok(AttendanceOutcome::AlreadyRecorded(existing.clone()));
    }
    let record = AttendanceRecord {
      attendance_id: Uuid::new_v4(),
      member: member.clone(),
      event_id,
      recorded_at: Utc::now(),
    };
    state.attendance.insert(key, record.clone());
    Ok(AttendanceOutcome::Recorded(record))
  }

  // ── Audit log & statistics ────────────────────────────────────────────

  async fn append_scan(
    &self,
    input: NewScanRecord,
  ) -> Result<ScanRecord, MemoryStoreError> {
    self.check_available()?;
    let record = ScanRecord {
      scan_id: Uuid::new_v4(),
      event_id: input.event_id,
      member: input.member,
      operator_id: input.operator_id,
      mode: input.mode,
      status: input.status,
      scanned_at: Utc::now(),
    };
    self.state.lock().unwrap().scans.push(record.clone());
    Ok(record)
  }

  async fn recent_scans(
    &self,
    event_id: Option<Uuid>,
    limit: usize,
  ) -> Result<Vec<ScanRecord>, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .scans
        .iter()
        .rev()
        .filter(|s| event_id.is_none() || s.event_id == event_id)
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  async fn summarize(&self, event_id: Uuid) -> Result<EventStatistics, MemoryStoreError> {
    self.check_available()?;
    let state = self.state.lock().unwrap();
    if !state.events.contains_key(&event_id) {
      return Err(MemoryStoreError::EventNotFound(event_id));
    }

    let mut stats = EventStatistics {
      event_id,
      total_scans: 0,
      successful_scans: 0,
      already_scanned: 0,
      denied_scans: 0,
      invalid_scans: 0,
      tickets_sold: 0,
      tickets_checked_in: 0,
      revenue_cents: 0,
      attendance_count: 0,
      categories: Vec::new(),
    };

    for scan in state.scans.iter().filter(|s| s.event_id == Some(event_id)) {
      stats.total_scans += 1;
      match scan.status {
        ScanStatus::Success => stats.successful_scans += 1,
        ScanStatus::AlreadyScanned => stats.already_scanned += 1,
        ScanStatus::InvalidCode => stats.invalid_scans += 1,
        _ => stats.denied_scans += 1,
      }
    }

    stats.tickets_sold = state
      .purchases
      .values()
      .filter(|p| p.event_id == event_id)
      .map(|p| u64::from(p.quantity))
      .sum();
    stats.attendance_count = state
      .attendance
      .values()
      .filter(|a| a.event_id == event_id)
      .count() as u64;

    if let Some(aggregates) = state.aggregates.get(&event_id) {
      stats.tickets_checked_in = u64::from(aggregates.total_checked_in);
      stats.revenue_cents = aggregates.total_revenue_cents;
    }

    stats.categories = state
      .categories
      .values()
      .filter(|c| c.event_id == event_id)
      .map(|c| CategoryStatistics {
        category_id: c.category_id,
        name: c.name.clone(),
        capacity: c.capacity,
        sold: c.sold,
        remaining: c.remaining(),
      })
      .collect();

    Ok(stats)
  }
}

// ─── Seed helpers ────────────────────────────────────────────────────────────

/// An active, unblocked, never-expiring membership.
pub fn active_member(reference: &str) -> Membership {
  Membership {
    member: MemberRef::new(reference),
    display_name: format!("Member {reference}"),
    plan: PlanKind::Lifetime,
    status: MembershipStatus::Active,
    expires_at: None,
    account_blocked: false,
    card_blocked: false,
    created_at: Utc::now(),
  }
}

/// An active event whose window comfortably covers "now".
pub fn open_event() -> Event {
  let now = Utc::now();
  Event {
    event_id: Uuid::new_v4(),
    title: "Members' Evening".into(),
    active: true,
    starts_at: now - Duration::hours(1),
    ends_at: now + Duration::hours(6),
    created_at: now - Duration::days(7),
  }
}

/// Seed an open event plus one active category with the given capacity.
/// Returns `(event_id, category_id)`.
pub async fn seed_event_with_category(
  store: &MemoryStore,
  capacity: u32,
) -> (Uuid, Uuid) {
  let event = open_event();
  let event_id = event.event_id;
  store.put_event(event).await.unwrap();

  let category = TicketCategory {
    category_id: Uuid::new_v4(),
    event_id,
    name: "General".into(),
    price_cents: 2500,
    capacity,
    sold: 0,
    active: true,
    members_only: false,
    sales_open_at: None,
    sales_close_at: None,
  };
  let category_id = category.category_id;
  store.put_category(category).await.unwrap();

  (event_id, category_id)
}

/// Allocate one ticket for `reference` against a fresh category of `event_id`
/// and mark it paid.
pub async fn paid_purchase(
  store: &MemoryStore,
  reference: &str,
  event_id: Uuid,
) -> TicketPurchase {
  let purchase = pending_purchase(store, reference, event_id).await;
  store
    .mark_purchase_paid(purchase.purchase_id)
    .await
    .unwrap()
    .unwrap()
}

/// Allocate one ticket for `reference`, leaving payment pending.
pub async fn pending_purchase(
  store: &MemoryStore,
  reference: &str,
  event_id: Uuid,
) -> TicketPurchase {
  let category = TicketCategory {
    category_id: Uuid::new_v4(),
    event_id,
    name: "General".into(),
    price_cents: 2500,
    capacity: 50,
    sold: 0,
    active: true,
    members_only: false,
    sales_open_at: None,
    sales_close_at: None,
  };
  let category_id = category.category_id;
  store.put_category(category).await.unwrap();

  let outcome = store
    .allocate(NewPurchase {
      member: MemberRef::new(reference),
      event_id,
      category_id,
      quantity: 1,
      ticket_number: crate::allocate::ticket_number(event_id),
    })
    .await
    .unwrap();
  match outcome {
    AllocationOutcome::Allocated(p) => p,
    other => panic!("seed allocation failed: {other:?}"),
  }
}
