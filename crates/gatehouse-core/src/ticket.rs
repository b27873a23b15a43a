//! Ticket purchases and attendance records — the two ledgers the engine
//! writes.
//!
//! A [`TicketPurchase`] is created once by the capacity allocator and
//! terminally mutated (check-in) by the eligibility resolver. An
//! [`AttendanceRecord`] is created exactly once per (member, event) pair in
//! ticketless mode and never updated afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::member::MemberRef;

// ─── Payment ─────────────────────────────────────────────────────────────────

/// Payment lifecycle of a purchase. The allocator always creates purchases as
/// `Pending`; the transition to `Paid` comes from the payment callback (out
/// of scope), routed through
/// [`crate::store::ClubStore::mark_purchase_paid`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Cancelled,
}

// ─── TicketPurchase ──────────────────────────────────────────────────────────

/// An allocation of `quantity` tickets against one category.
///
/// `checked_in`/`checked_in_at` are the only fields the resolver may mutate,
/// exactly once: `false → true`, never reversed by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPurchase {
  pub purchase_id:   Uuid,
  pub member:        MemberRef,
  pub event_id:      Uuid,
  pub category_id:   Uuid,
  pub quantity:      u32,
  /// Human-readable, unique across the store (e.g. `GH-4F21-TXK9QM`).
  pub ticket_number: String,
  /// Quantity × the category price read inside the allocation transaction.
  pub amount_cents:  i64,
  pub payment:       PaymentStatus,
  pub checked_in:    bool,
  pub checked_in_at: Option<DateTime<Utc>>,
  pub purchased_at:  DateTime<Utc>,
}

// ─── AttendanceRecord ────────────────────────────────────────────────────────

/// Proof that a member was granted entry to a ticketless event.
/// At most one per (member, event) pair; append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub attendance_id: Uuid,
  pub member:        MemberRef,
  pub event_id:      Uuid,
  pub recorded_at:   DateTime<Utc>,
}
