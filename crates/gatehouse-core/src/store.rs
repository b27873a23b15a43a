//! The `ClubStore` trait and its typed write outcomes.
//!
//! The trait is implemented by storage backends (e.g.
//! `gatehouse-store-sqlite`). Higher layers (`gatehouse-engine`,
//! `gatehouse-api`) depend on this abstraction, not on any concrete backend.
//!
//! The three conditional writes — [`ClubStore::allocate`],
//! [`ClubStore::check_in`], [`ClubStore::record_attendance`] — are the only
//! paths that mutate `sold`, `checked_in`, or attendance existence. Each is
//! an atomic read-verify-write: a backend commits either the whole effect or
//! none of it, and reports the losing side of a race as a typed outcome
//! rather than an error. Any store with a conditional-commit primitive can
//! satisfy this (SQL transactions, a KV CAS, or a mutex-guarded map in
//! tests).

use std::future::Future;

use uuid::Uuid;

use crate::{
  event::{Event, EventAggregates, TicketCategory},
  member::{MemberRef, Membership},
  scan::{NewScanRecord, ScanRecord},
  stats::EventStatistics,
  ticket::{AttendanceRecord, TicketPurchase},
};

// ─── Write inputs ────────────────────────────────────────────────────────────

/// Input to [`ClubStore::allocate`].
///
/// `purchase_id`, `purchased_at`, and the initial `Pending` payment status
/// are set by the store; `amount_cents` is computed from the category price
/// read inside the allocation transaction.
#[derive(Debug, Clone)]
pub struct NewPurchase {
  pub member:        MemberRef,
  pub event_id:      Uuid,
  pub category_id:   Uuid,
  pub quantity:      u32,
  pub ticket_number: String,
}

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Result of one allocation attempt against a category.
#[derive(Debug, Clone)]
pub enum AllocationOutcome {
  /// Capacity reserved, purchase row committed, aggregates bumped.
  Allocated(TicketPurchase),
  /// `sold + quantity` would exceed `capacity`; nothing was written.
  SoldOut { sold: u32, capacity: u32 },
  /// Category missing, inactive, outside its sales window, or not part of
  /// the requested event; nothing was written.
  Unavailable,
  /// The generated ticket number already exists. Retryable with a fresh
  /// number; the colliding row is never overwritten.
  NumberTaken,
  /// The backend aborted the transaction because a concurrent writer touched
  /// the category between read and commit. Retryable; backends with a
  /// serialized writer never emit it.
  Conflict,
}

/// Result of the `checked_in: false → true` transition.
#[derive(Debug, Clone)]
pub enum CheckInOutcome {
  /// This call won the transition; the snapshot carries the fresh
  /// `checked_in_at`.
  CheckedIn(TicketPurchase),
  /// The field was already `true` at commit time; the snapshot carries the
  /// original `checked_in_at`.
  AlreadyCheckedIn(TicketPurchase),
}

/// Result of the conditional attendance insert.
#[derive(Debug, Clone)]
pub enum AttendanceOutcome {
  Recorded(AttendanceRecord),
  /// A record for this (member, event) pair already existed; the existing
  /// row is returned untouched.
  AlreadyRecorded(AttendanceRecord),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Gatehouse storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ClubStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Memberships (written by billing/admin, read by the engine) ────────

  /// Insert or replace a membership record.
  fn put_membership(
    &self,
    membership: Membership,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_membership<'a>(
    &'a self,
    member: &'a MemberRef,
  ) -> impl Future<Output = Result<Option<Membership>, Self::Error>> + Send + 'a;

  // ── Events & categories ───────────────────────────────────────────────

  /// Insert or replace an event, creating its zeroed aggregates row if one
  /// does not exist yet.
  fn put_event(
    &self,
    event: Event,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Insert or replace a category definition. `sold` on an existing row is
  /// preserved — the counter belongs to [`ClubStore::allocate`] alone.
  fn put_category(
    &self,
    category: TicketCategory,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_category(
    &self,
    category_id: Uuid,
  ) -> impl Future<Output = Result<Option<TicketCategory>, Self::Error>> + Send + '_;

  fn list_categories(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TicketCategory>, Self::Error>> + Send + '_;

  fn get_event_aggregates(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<EventAggregates, Self::Error>> + Send + '_;

  // ── Purchases ─────────────────────────────────────────────────────────

  fn get_purchase(
    &self,
    purchase_id: Uuid,
  ) -> impl Future<Output = Result<Option<TicketPurchase>, Self::Error>> + Send + '_;

  /// The paid purchase a gate scan should consider for (member, event):
  /// an un-checked-in one if any exists, otherwise the earliest checked-in
  /// one (so the resolver can report when it was used).
  fn find_gate_purchase<'a>(
    &'a self,
    member: &'a MemberRef,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<TicketPurchase>, Self::Error>> + Send + 'a;

  fn list_purchases(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TicketPurchase>, Self::Error>> + Send + '_;

  /// The payment-callback seam: transition `Pending → Paid`. Returns `None`
  /// if the purchase does not exist.
  fn mark_purchase_paid(
    &self,
    purchase_id: Uuid,
  ) -> impl Future<Output = Result<Option<TicketPurchase>, Self::Error>> + Send + '_;

  // ── Conditional writes ────────────────────────────────────────────────

  /// Atomically reserve `input.quantity` units of capacity and persist the
  /// purchase, re-verifying activation, sales window, and
  /// `sold + quantity <= capacity` against current state inside the
  /// transaction. Either the capacity bump, the purchase row, and the
  /// aggregate update all commit, or none do.
  fn allocate(
    &self,
    input: NewPurchase,
  ) -> impl Future<Output = Result<AllocationOutcome, Self::Error>> + Send + '_;

  /// Atomically transition `checked_in: false → true`, conditioned on the
  /// field still being `false` at commit time, and bump the event's
  /// `total_checked_in` in the same transaction. Errors if the purchase
  /// does not exist.
  fn check_in(
    &self,
    purchase_id: Uuid,
  ) -> impl Future<Output = Result<CheckInOutcome, Self::Error>> + Send + '_;

  /// Create an attendance record for (member, event) only if one does not
  /// already exist.
  fn record_attendance<'a>(
    &'a self,
    member: &'a MemberRef,
    event_id: Uuid,
  ) -> impl Future<Output = Result<AttendanceOutcome, Self::Error>> + Send + 'a;

  // ── Audit log & statistics ────────────────────────────────────────────

  /// Append one line to the scan log. `scanned_at` is set by the store.
  fn append_scan(
    &self,
    input: NewScanRecord,
  ) -> impl Future<Output = Result<ScanRecord, Self::Error>> + Send + '_;

  /// Most recent scans, newest first, optionally restricted to one event.
  fn recent_scans(
    &self,
    event_id: Option<Uuid>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ScanRecord>, Self::Error>> + Send + '_;

  /// Roll up the scan log, ticket ledger, and attendance ledger for one
  /// event. Errors if the event does not exist.
  fn summarize(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<EventStatistics, Self::Error>> + Send + '_;
}
