//! Scan modes, outcomes, and the audit-log record.
//!
//! A gate scanner is configured with a [`ScanMode`] that selects which
//! eligibility rule applies. The resolver returns a [`ScanResult`] — a value
//! object, never persisted — and appends a [`ScanRecord`] to the audit log
//! afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  member::{MemberRef, Membership},
  ticket::{AttendanceRecord, TicketPurchase},
};

// ─── ScanMode ────────────────────────────────────────────────────────────────

/// The policy governing which eligibility rule applies at a gate. A closed
/// sum type so every caller handles all three modes; the event id is part of
/// the variant, making "event required unless subscription-only" a
/// compile-time fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScanMode {
  /// Clubhouse door: any member with a current subscription.
  SubscriptionOnly,
  /// Ticketless event: entry recorded in the attendance ledger.
  EventAttendance { event_id: Uuid },
  /// Ticketed event: entry consumes the member's paid ticket.
  EventWithTicket { event_id: Uuid },
}

impl ScanMode {
  pub fn kind(&self) -> ScanModeKind {
    match self {
      Self::SubscriptionOnly => ScanModeKind::SubscriptionOnly,
      Self::EventAttendance { .. } => ScanModeKind::EventAttendance,
      Self::EventWithTicket { .. } => ScanModeKind::EventWithTicket,
    }
  }

  pub fn event_id(&self) -> Option<Uuid> {
    match self {
      Self::SubscriptionOnly => None,
      Self::EventAttendance { event_id } | Self::EventWithTicket { event_id } => {
        Some(*event_id)
      }
    }
  }
}

/// Flat discriminant of [`ScanMode`], persisted in the scan log.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanModeKind {
  SubscriptionOnly,
  EventAttendance,
  EventWithTicket,
}

// ─── ScanStatus ──────────────────────────────────────────────────────────────

/// The decision a scan resolved to. Denials are first-class results, not
/// errors; store faults travel the `Err` path instead so callers can retry
/// rather than refuse entry.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScanStatus {
  Success,
  /// Malformed token; nothing was looked up.
  InvalidCode,
  MemberNotFound,
  Blocked,
  SubscriptionInactive,
  EventUnavailable,
  NoTicket,
  /// The member was already admitted; the result snapshot carries the
  /// original check-in instant for display.
  AlreadyScanned,
}

impl ScanStatus {
  pub fn is_success(&self) -> bool { matches!(self, Self::Success) }
}

// ─── ScanResult ──────────────────────────────────────────────────────────────

/// The return value of a resolution: a status tag plus denormalized
/// snapshots for the gate display. Never persisted as such.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
  pub status:     ScanStatus,
  pub membership: Option<Membership>,
  pub purchase:   Option<TicketPurchase>,
  pub attendance: Option<AttendanceRecord>,
}

impl ScanResult {
  /// A result with no snapshots — the token never resolved to a member.
  pub fn bare(status: ScanStatus) -> Self {
    Self {
      status,
      membership: None,
      purchase: None,
      attendance: None,
    }
  }

  /// A result carrying the membership snapshot for display.
  pub fn for_member(status: ScanStatus, membership: Membership) -> Self {
    Self {
      status,
      membership: Some(membership),
      purchase: None,
      attendance: None,
    }
  }
}

// ─── Audit log ───────────────────────────────────────────────────────────────

/// One appended line in the recent-scans feed. Written after the decision;
/// never gates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
  pub scan_id:     Uuid,
  pub event_id:    Option<Uuid>,
  /// `None` when the token did not decode to a member.
  pub member:      Option<MemberRef>,
  pub operator_id: String,
  pub mode:        ScanModeKind,
  pub status:      ScanStatus,
  pub scanned_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ClubStore::append_scan`].
/// `scan_id` and `scanned_at` are set by the store.
#[derive(Debug, Clone)]
pub struct NewScanRecord {
  pub event_id:    Option<Uuid>,
  pub member:      Option<MemberRef>,
  pub operator_id: String,
  pub mode:        ScanModeKind,
  pub status:      ScanStatus,
}
