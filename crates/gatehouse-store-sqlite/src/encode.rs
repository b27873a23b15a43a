//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Status enums are stored as
//! their snake_case discriminants (the `strum` `Display`/`FromStr` forms).
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, Utc};
use gatehouse_core::{
  event::{Event, TicketCategory},
  member::{MemberRef, Membership},
  scan::ScanRecord,
  ticket::{AttendanceRecord, TicketPurchase},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Status enums ────────────────────────────────────────────────────────────

/// Parse a snake_case discriminant back into its enum, surfacing unknown
/// values as [`Error::Discriminant`].
pub fn decode_enum<T: std::str::FromStr>(s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Discriminant(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `memberships` row.
pub struct RawMembership {
  pub member_ref:      String,
  pub display_name:    String,
  pub plan:            String,
  pub status:          String,
  pub expires_at:      Option<String>,
  pub account_blocked: bool,
  pub card_blocked:    bool,
  pub created_at:      String,
}

impl RawMembership {
  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      member:          MemberRef::new(self.member_ref),
      display_name:    self.display_name,
      plan:            decode_enum(&self.plan)?,
      status:          decode_enum(&self.status)?,
      expires_at:      decode_dt_opt(self.expires_at.as_deref())?,
      account_blocked: self.account_blocked,
      card_blocked:    self.card_blocked,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:   String,
  pub title:      String,
  pub active:     bool,
  pub starts_at:  String,
  pub ends_at:    String,
  pub created_at: String,
}

impl RawEvent {
  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:   decode_uuid(&self.event_id)?,
      title:      self.title,
      active:     self.active,
      starts_at:  decode_dt(&self.starts_at)?,
      ends_at:    decode_dt(&self.ends_at)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `ticket_categories` row.
pub struct RawCategory {
  pub category_id:    String,
  pub event_id:       String,
  pub name:           String,
  pub price_cents:    i64,
  pub capacity:       u32,
  pub sold:           u32,
  pub active:         bool,
  pub members_only:   bool,
  pub sales_open_at:  Option<String>,
  pub sales_close_at: Option<String>,
}

impl RawCategory {
  pub fn into_category(self) -> Result<TicketCategory> {
    Ok(TicketCategory {
      category_id:    decode_uuid(&self.category_id)?,
      event_id:       decode_uuid(&self.event_id)?,
      name:           self.name,
      price_cents:    self.price_cents,
      capacity:       self.capacity,
      sold:           self.sold,
      active:         self.active,
      members_only:   self.members_only,
      sales_open_at:  decode_dt_opt(self.sales_open_at.as_deref())?,
      sales_close_at: decode_dt_opt(self.sales_close_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `ticket_purchases` row.
pub struct RawPurchase {
  pub purchase_id:   String,
  pub member_ref:    String,
  pub event_id:      String,
  pub category_id:   String,
  pub quantity:      u32,
  pub ticket_number: String,
  pub amount_cents:  i64,
  pub payment:       String,
  pub checked_in:    bool,
  pub checked_in_at: Option<String>,
  pub purchased_at:  String,
}

impl RawPurchase {
  /// The column list matching [`RawPurchase::from_row`]; keep the two in
  /// sync.
  pub const COLUMNS: &'static str = "purchase_id, member_ref, event_id, \
     category_id, quantity, ticket_number, amount_cents, payment, \
     checked_in, checked_in_at, purchased_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      purchase_id:   row.get(0)?,
      member_ref:    row.get(1)?,
      event_id:      row.get(2)?,
      category_id:   row.get(3)?,
      quantity:      row.get(4)?,
      ticket_number: row.get(5)?,
      amount_cents:  row.get(6)?,
      payment:       row.get(7)?,
      checked_in:    row.get(8)?,
      checked_in_at: row.get(9)?,
      purchased_at:  row.get(10)?,
    })
  }

  pub fn into_purchase(self) -> Result<TicketPurchase> {
    Ok(TicketPurchase {
      purchase_id:   decode_uuid(&self.purchase_id)?,
      member:        MemberRef::new(self.member_ref),
      event_id:      decode_uuid(&self.event_id)?,
      category_id:   decode_uuid(&self.category_id)?,
      quantity:      self.quantity,
      ticket_number: self.ticket_number,
      amount_cents:  self.amount_cents,
      payment:       decode_enum(&self.payment)?,
      checked_in:    self.checked_in,
      checked_in_at: decode_dt_opt(self.checked_in_at.as_deref())?,
      purchased_at:  decode_dt(&self.purchased_at)?,
    })
  }
}

/// Raw strings read directly from an `attendance_records` row.
pub struct RawAttendance {
  pub attendance_id: String,
  pub member_ref:    String,
  pub event_id:      String,
  pub recorded_at:   String,
}

impl RawAttendance {
  pub fn into_attendance(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      attendance_id: decode_uuid(&self.attendance_id)?,
      member:        MemberRef::new(self.member_ref),
      event_id:      decode_uuid(&self.event_id)?,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw strings read directly from a `scan_log` row.
pub struct RawScan {
  pub scan_id:     String,
  pub event_id:    Option<String>,
  pub member_ref:  Option<String>,
  pub operator_id: String,
  pub mode:        String,
  pub status:      String,
  pub scanned_at:  String,
}

impl RawScan {
  pub fn into_scan(self) -> Result<ScanRecord> {
    Ok(ScanRecord {
      scan_id:     decode_uuid(&self.scan_id)?,
      event_id:    self.event_id.as_deref().map(decode_uuid).transpose()?,
      member:      self.member_ref.map(MemberRef::new),
      operator_id: self.operator_id,
      mode:        decode_enum(&self.mode)?,
      status:      decode_enum(&self.status)?,
      scanned_at:  decode_dt(&self.scanned_at)?,
    })
  }
}
