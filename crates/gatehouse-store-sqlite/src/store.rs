//! [`SqliteStore`] — the SQLite implementation of [`ClubStore`].
//!
//! Every conditional write runs as an explicit transaction inside one
//! `call` closure, so it commits whole or not at all. The connection is
//! serviced by a single dedicated thread, which serializes writers; races
//! between concurrent callers are decided by whoever's transaction runs
//! first, and the loser observes the committed state.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gatehouse_core::{
  event::{Event, EventAggregates, TicketCategory},
  member::{MemberRef, Membership},
  scan::{NewScanRecord, ScanRecord, ScanStatus},
  stats::{CategoryStatistics, EventStatistics},
  store::{
    AllocationOutcome, AttendanceOutcome, CheckInOutcome, ClubStore, NewPurchase,
  },
  ticket::TicketPurchase,
};

use crate::{
  Error, Result,
  encode::{
    RawAttendance, RawCategory, RawEvent, RawMembership, RawPurchase, RawScan,
    decode_enum, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gatehouse club store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Fetch one purchase row inside a `call` closure. `conn` may be a
/// transaction — it derefs to the underlying connection.
fn select_purchase(
  conn: &rusqlite::Connection,
  purchase_id_str: &str,
) -> rusqlite::Result<Option<RawPurchase>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM ticket_purchases WHERE purchase_id = ?1",
        RawPurchase::COLUMNS
      ),
      rusqlite::params![purchase_id_str],
      RawPurchase::from_row,
    )
    .optional()
}

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawCategory> {
  Ok(RawCategory {
    category_id:    row.get(0)?,
    event_id:       row.get(1)?,
    name:           row.get(2)?,
    price_cents:    row.get(3)?,
    capacity:       row.get(4)?,
    sold:           row.get(5)?,
    active:         row.get(6)?,
    members_only:   row.get(7)?,
    sales_open_at:  row.get(8)?,
    sales_close_at: row.get(9)?,
  })
}

const CATEGORY_COLUMNS: &str = "category_id, event_id, name, price_cents, \
   capacity, sold, active, members_only, sales_open_at, sales_close_at";

/// Private mirror of [`AllocationOutcome`] carrying the raw row, so the
/// decode can happen outside the `call` closure.
enum RawAllocation {
  Allocated(RawPurchase),
  SoldOut { sold: u32, capacity: u32 },
  Unavailable,
  NumberTaken,
}

// ─── ClubStore impl ──────────────────────────────────────────────────────────

impl ClubStore for SqliteStore {
  type Error = Error;

  // ── Memberships ───────────────────────────────────────────────────────────

  async fn put_membership(&self, membership: Membership) -> Result<()> {
    let member_str     = membership.member.as_str().to_owned();
    let display_name   = membership.display_name;
    let plan_str       = membership.plan.to_string();
    let status_str     = membership.status.to_string();
    let expires_str    = membership.expires_at.map(encode_dt);
    let account_block  = membership.account_blocked;
    let card_block     = membership.card_blocked;
    let created_str    = encode_dt(membership.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO memberships (
             member_ref, display_name, plan, status, expires_at,
             account_blocked, card_blocked, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(member_ref) DO UPDATE SET
             display_name    = excluded.display_name,
             plan            = excluded.plan,
             status          = excluded.status,
             expires_at      = excluded.expires_at,
             account_blocked = excluded.account_blocked,
             card_blocked    = excluded.card_blocked",
          rusqlite::params![
            member_str,
            display_name,
            plan_str,
            status_str,
            expires_str,
            account_block,
            card_block,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_membership(&self, member: &MemberRef) -> Result<Option<Membership>> {
    let member_str = member.as_str().to_owned();

    let raw: Option<RawMembership> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT member_ref, display_name, plan, status, expires_at,
                      account_blocked, card_blocked, created_at
               FROM memberships WHERE member_ref = ?1",
              rusqlite::params![member_str],
              |row| {
                Ok(RawMembership {
                  member_ref:      row.get(0)?,
                  display_name:    row.get(1)?,
                  plan:            row.get(2)?,
                  status:          row.get(3)?,
                  expires_at:      row.get(4)?,
                  account_blocked: row.get(5)?,
                  card_blocked:    row.get(6)?,
                  created_at:      row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMembership::into_membership).transpose()
  }

  // ── Events & categories ───────────────────────────────────────────────────

  async fn put_event(&self, event: Event) -> Result<()> {
    let event_id_str = encode_uuid(event.event_id);
    let title        = event.title;
    let active       = event.active;
    let starts_str   = encode_dt(event.starts_at);
    let ends_str     = encode_dt(event.ends_at);
    let created_str  = encode_dt(event.created_at);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO events (event_id, title, active, starts_at, ends_at, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT(event_id) DO UPDATE SET
             title     = excluded.title,
             active    = excluded.active,
             starts_at = excluded.starts_at,
             ends_at   = excluded.ends_at",
          rusqlite::params![event_id_str, title, active, starts_str, ends_str, created_str],
        )?;
        tx.execute(
          "INSERT OR IGNORE INTO event_aggregates (event_id) VALUES (?1)",
          rusqlite::params![event_id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>> {
    let event_id_str = encode_uuid(event_id);

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT event_id, title, active, starts_at, ends_at, created_at
               FROM events WHERE event_id = ?1",
              rusqlite::params![event_id_str],
              |row| {
                Ok(RawEvent {
                  event_id:   row.get(0)?,
                  title:      row.get(1)?,
                  active:     row.get(2)?,
                  starts_at:  row.get(3)?,
                  ends_at:    row.get(4)?,
                  created_at: row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn put_category(&self, category: TicketCategory) -> Result<()> {
    let category_id_str = encode_uuid(category.category_id);
    let event_id_str    = encode_uuid(category.event_id);
    let name            = category.name;
    let price_cents     = category.price_cents;
    let capacity        = category.capacity;
    let sold            = category.sold;
    let active          = category.active;
    let members_only    = category.members_only;
    let open_str        = category.sales_open_at.map(encode_dt);
    let close_str       = category.sales_close_at.map(encode_dt);

    self
      .conn
      .call(move |conn| {
        // `sold` is deliberately absent from the update list — the counter
        // belongs to the allocation transaction.
        conn.execute(
          "INSERT INTO ticket_categories (
             category_id, event_id, name, price_cents, capacity, sold,
             active, members_only, sales_open_at, sales_close_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT(category_id) DO UPDATE SET
             event_id       = excluded.event_id,
             name           = excluded.name,
             price_cents    = excluded.price_cents,
             capacity       = excluded.capacity,
             active         = excluded.active,
             members_only   = excluded.members_only,
             sales_open_at  = excluded.sales_open_at,
             sales_close_at = excluded.sales_close_at",
          rusqlite::params![
            category_id_str,
            event_id_str,
            name,
            price_cents,
            capacity,
            sold,
            active,
            members_only,
            open_str,
            close_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_category(&self, category_id: Uuid) -> Result<Option<TicketCategory>> {
    let category_id_str = encode_uuid(category_id);

    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CATEGORY_COLUMNS} FROM ticket_categories WHERE category_id = ?1"
              ),
              rusqlite::params![category_id_str],
              category_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCategory::into_category).transpose()
  }

  async fn list_categories(&self, event_id: Uuid) -> Result<Vec<TicketCategory>> {
    let event_id_str = encode_uuid(event_id);

    let raws: Vec<RawCategory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CATEGORY_COLUMNS} FROM ticket_categories WHERE event_id = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_id_str], category_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  async fn get_event_aggregates(&self, event_id: Uuid) -> Result<EventAggregates> {
    let event_id_str = encode_uuid(event_id);

    let row: Option<(u32, i64, u32)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT total_sold, total_revenue_cents, total_checked_in
               FROM event_aggregates WHERE event_id = ?1",
              rusqlite::params![event_id_str],
              |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(match row {
      Some((total_sold, total_revenue_cents, total_checked_in)) => EventAggregates {
        event_id,
        total_sold,
        total_revenue_cents,
        total_checked_in,
      },
      None => EventAggregates::empty(event_id),
    })
  }

  // ── Purchases ─────────────────────────────────────────────────────────────

  async fn get_purchase(&self, purchase_id: Uuid) -> Result<Option<TicketPurchase>> {
    let id_str = encode_uuid(purchase_id);

    let raw: Option<RawPurchase> = self
      .conn
      .call(move |conn| Ok(select_purchase(conn, &id_str)?))
      .await?;

    raw.map(RawPurchase::into_purchase).transpose()
  }

  async fn find_gate_purchase(
    &self,
    member: &MemberRef,
    event_id: Uuid,
  ) -> Result<Option<TicketPurchase>> {
    let member_str   = member.as_str().to_owned();
    let event_id_str = encode_uuid(event_id);

    let raw: Option<RawPurchase> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM ticket_purchases
                 WHERE member_ref = ?1 AND event_id = ?2 AND payment = 'paid'
                 ORDER BY checked_in ASC, purchased_at ASC
                 LIMIT 1",
                RawPurchase::COLUMNS
              ),
              rusqlite::params![member_str, event_id_str],
              RawPurchase::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPurchase::into_purchase).transpose()
  }

  async fn list_purchases(&self, event_id: Uuid) -> Result<Vec<TicketPurchase>> {
    let event_id_str = encode_uuid(event_id);

    let raws: Vec<RawPurchase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM ticket_purchases WHERE event_id = ?1
           ORDER BY purchased_at ASC",
          RawPurchase::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_id_str], RawPurchase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPurchase::into_purchase).collect()
  }

  async fn mark_purchase_paid(&self, purchase_id: Uuid) -> Result<Option<TicketPurchase>> {
    let id_str = encode_uuid(purchase_id);

    let raw: Option<RawPurchase> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE ticket_purchases SET payment = 'paid' WHERE purchase_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(select_purchase(conn, &id_str)?)
      })
      .await?;

    raw.map(RawPurchase::into_purchase).transpose()
  }

  // ── Conditional writes ────────────────────────────────────────────────────

  async fn allocate(&self, input: NewPurchase) -> Result<AllocationOutcome> {
    let purchase_id_str = encode_uuid(Uuid::new_v4());
    let member_str      = input.member.as_str().to_owned();
    let event_id_str    = encode_uuid(input.event_id);
    let category_id_str = encode_uuid(input.category_id);
    let quantity        = input.quantity;
    let ticket_number   = input.ticket_number;
    let now_str         = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, i64, u32, u32, bool, Option<String>, Option<String>)> =
          tx.query_row(
            "SELECT event_id, price_cents, capacity, sold, active,
                    sales_open_at, sales_close_at
             FROM ticket_categories WHERE category_id = ?1",
            rusqlite::params![category_id_str],
            |r| {
              Ok((
                r.get(0)?,
                r.get(1)?,
                r.get(2)?,
                r.get(3)?,
                r.get(4)?,
                r.get(5)?,
                r.get(6)?,
              ))
            },
          )
          .optional()?;

        let Some((cat_event_id, price_cents, capacity, sold, active, open_at, close_at)) =
          row
        else {
          return Ok(RawAllocation::Unavailable);
        };

        // RFC 3339 UTC strings order lexicographically, so the sales-window
        // check stays in text space.
        let window_open = open_at.as_deref().is_none_or(|o| o <= now_str.as_str())
          && close_at.as_deref().is_none_or(|c| now_str.as_str() <= c);
        if cat_event_id != event_id_str || !active || !window_open {
          return Ok(RawAllocation::Unavailable);
        }

        if sold + quantity > capacity {
          return Ok(RawAllocation::SoldOut { sold, capacity });
        }

        let amount_cents = price_cents * i64::from(quantity);

        match tx.execute(
          "INSERT INTO ticket_purchases (
             purchase_id, member_ref, event_id, category_id, quantity,
             ticket_number, amount_cents, payment, checked_in, checked_in_at,
             purchased_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', 0, NULL, ?8)",
          rusqlite::params![
            purchase_id_str,
            member_str,
            event_id_str,
            category_id_str,
            quantity,
            ticket_number,
            amount_cents,
            now_str,
          ],
        ) {
          Ok(_) => {}
          // A duplicate ticket number aborts this attempt; the transaction
          // rolls back on drop and the caller retries with a fresh number.
          Err(rusqlite::Error::SqliteFailure(e, msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
              && msg.as_deref().is_some_and(|m| m.contains("ticket_number")) =>
          {
            return Ok(RawAllocation::NumberTaken);
          }
          Err(e) => return Err(e.into()),
        }

        tx.execute(
          "UPDATE ticket_categories SET sold = sold + ?1 WHERE category_id = ?2",
          rusqlite::params![quantity, category_id_str],
        )?;

        tx.execute(
          "INSERT INTO event_aggregates (
             event_id, total_sold, total_revenue_cents, total_checked_in
           ) VALUES (?1, ?2, ?3, 0)
           ON CONFLICT(event_id) DO UPDATE SET
             total_sold          = total_sold + excluded.total_sold,
             total_revenue_cents = total_revenue_cents + excluded.total_revenue_cents",
          rusqlite::params![event_id_str, quantity, amount_cents],
        )?;

        let raw = select_purchase(&tx, &purchase_id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tx.commit()?;
        Ok(RawAllocation::Allocated(raw))
      })
      .await?;

    Ok(match raw {
      RawAllocation::Allocated(p) => AllocationOutcome::Allocated(p.into_purchase()?),
      RawAllocation::SoldOut { sold, capacity } => {
        AllocationOutcome::SoldOut { sold, capacity }
      }
      RawAllocation::Unavailable => AllocationOutcome::Unavailable,
      RawAllocation::NumberTaken => AllocationOutcome::NumberTaken,
    })
  }

  async fn check_in(&self, purchase_id: Uuid) -> Result<CheckInOutcome> {
    let id_str  = encode_uuid(purchase_id);
    let now_str = encode_dt(Utc::now());

    let (won, raw): (bool, Option<RawPurchase>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // The WHERE clause is the compare-and-swap: it matches only while
        // the flag is still unset.
        let updated = tx.execute(
          "UPDATE ticket_purchases SET checked_in = 1, checked_in_at = ?1
           WHERE purchase_id = ?2 AND checked_in = 0",
          rusqlite::params![now_str, id_str],
        )?;

        if updated == 1 {
          let event_id_str: String = tx.query_row(
            "SELECT event_id FROM ticket_purchases WHERE purchase_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )?;
          tx.execute(
            "INSERT INTO event_aggregates (
               event_id, total_sold, total_revenue_cents, total_checked_in
             ) VALUES (?1, 0, 0, 1)
             ON CONFLICT(event_id) DO UPDATE SET
               total_checked_in = total_checked_in + 1",
            rusqlite::params![event_id_str],
          )?;
        }

        let raw = select_purchase(&tx, &id_str)?;
        tx.commit()?;
        Ok((updated == 1, raw))
      })
      .await?;

    let Some(raw) = raw else {
      return Err(Error::PurchaseNotFound(purchase_id));
    };
    let purchase = raw.into_purchase()?;

    Ok(if won {
      CheckInOutcome::CheckedIn(purchase)
    } else {
      CheckInOutcome::AlreadyCheckedIn(purchase)
    })
  }

  async fn record_attendance(
    &self,
    member: &MemberRef,
    event_id: Uuid,
  ) -> Result<AttendanceOutcome> {
    let attendance_id_str = encode_uuid(Uuid::new_v4());
    let member_str        = member.as_str().to_owned();
    let event_id_str      = encode_uuid(event_id);
    let now_str           = encode_dt(Utc::now());

    let (created, raw): (bool, RawAttendance) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let inserted = tx.execute(
          "INSERT INTO attendance_records (
             attendance_id, member_ref, event_id, recorded_at
           ) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(member_ref, event_id) DO NOTHING",
          rusqlite::params![attendance_id_str, member_str, event_id_str, now_str],
        )?;

        // Present whether this call created it or lost the race.
        let raw = tx.query_row(
          "SELECT attendance_id, member_ref, event_id, recorded_at
           FROM attendance_records WHERE member_ref = ?1 AND event_id = ?2",
          rusqlite::params![member_str, event_id_str],
          |row| {
            Ok(RawAttendance {
              attendance_id: row.get(0)?,
              member_ref:    row.get(1)?,
              event_id:      row.get(2)?,
              recorded_at:   row.get(3)?,
            })
          },
        )?;

        tx.commit()?;
        Ok((inserted == 1, raw))
      })
      .await?;

    let record = raw.into_attendance()?;
    Ok(if created {
      AttendanceOutcome::Recorded(record)
    } else {
      AttendanceOutcome::AlreadyRecorded(record)
    })
  }

  // ── Audit log & statistics ────────────────────────────────────────────────

  async fn append_scan(&self, input: NewScanRecord) -> Result<ScanRecord> {
    let record = ScanRecord {
      scan_id:     Uuid::new_v4(),
      event_id:    input.event_id,
      member:      input.member,
      operator_id: input.operator_id,
      mode:        input.mode,
      status:      input.status,
      scanned_at:  Utc::now(),
    };

    let scan_id_str    = encode_uuid(record.scan_id);
    let event_id_str   = record.event_id.map(encode_uuid);
    let member_str     = record.member.as_ref().map(|m| m.as_str().to_owned());
    let operator_id    = record.operator_id.clone();
    let mode_str       = record.mode.to_string();
    let status_str     = record.status.to_string();
    let scanned_at_str = encode_dt(record.scanned_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO scan_log (
             scan_id, event_id, member_ref, operator_id, mode, status, scanned_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            scan_id_str,
            event_id_str,
            member_str,
            operator_id,
            mode_str,
            status_str,
            scanned_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn recent_scans(
    &self,
    event_id: Option<Uuid>,
    limit: usize,
  ) -> Result<Vec<ScanRecord>> {
    let event_id_str = event_id.map(encode_uuid);
    let limit_val    = limit as i64;

    let raws: Vec<RawScan> = self
      .conn
      .call(move |conn| {
        let scan_from_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<RawScan> {
          Ok(RawScan {
            scan_id:     row.get(0)?,
            event_id:    row.get(1)?,
            member_ref:  row.get(2)?,
            operator_id: row.get(3)?,
            mode:        row.get(4)?,
            status:      row.get(5)?,
            scanned_at:  row.get(6)?,
          })
        };

        let rows = if let Some(event_id_str) = event_id_str {
          let mut stmt = conn.prepare(
            "SELECT scan_id, event_id, member_ref, operator_id, mode, status, scanned_at
             FROM scan_log WHERE event_id = ?1
             ORDER BY scanned_at DESC, rowid DESC
             LIMIT ?2",
          )?;
          stmt
            .query_map(rusqlite::params![event_id_str, limit_val], scan_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT scan_id, event_id, member_ref, operator_id, mode, status, scanned_at
             FROM scan_log
             ORDER BY scanned_at DESC, rowid DESC
             LIMIT ?1",
          )?;
          stmt
            .query_map(rusqlite::params![limit_val], scan_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawScan::into_scan).collect()
  }

  async fn summarize(&self, event_id: Uuid) -> Result<EventStatistics> {
    let event_id_str = encode_uuid(event_id);

    type RawSummary =
      (bool, Vec<(String, i64)>, i64, i64, Option<(u32, i64)>, Vec<RawCategory>);

    let (exists, scan_counts, tickets_sold, attendance, aggregates, categories): RawSummary =
      self
        .conn
        .call(move |conn| {
          let exists: bool = conn
            .query_row(
              "SELECT 1 FROM events WHERE event_id = ?1",
              rusqlite::params![event_id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !exists {
            return Ok((false, vec![], 0, 0, None, vec![]));
          }

          let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM scan_log WHERE event_id = ?1 GROUP BY status",
          )?;
          let scan_counts = stmt
            .query_map(rusqlite::params![event_id_str], |r| {
              Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

          let tickets_sold: i64 = conn.query_row(
            "SELECT COALESCE(SUM(quantity), 0) FROM ticket_purchases WHERE event_id = ?1",
            rusqlite::params![event_id_str],
            |r| r.get(0),
          )?;

          let attendance: i64 = conn.query_row(
            "SELECT COUNT(*) FROM attendance_records WHERE event_id = ?1",
            rusqlite::params![event_id_str],
            |r| r.get(0),
          )?;

          let aggregates: Option<(u32, i64)> = conn
            .query_row(
              "SELECT total_checked_in, total_revenue_cents
               FROM event_aggregates WHERE event_id = ?1",
              rusqlite::params![event_id_str],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

          let mut stmt = conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM ticket_categories WHERE event_id = ?1"
          ))?;
          let categories = stmt
            .query_map(rusqlite::params![event_id_str], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

          Ok((true, scan_counts, tickets_sold, attendance, aggregates, categories))
        })
        .await?;

    if !exists {
      return Err(Error::EventNotFound(event_id));
    }

    let mut stats = EventStatistics {
      event_id,
      total_scans: 0,
      successful_scans: 0,
      already_scanned: 0,
      denied_scans: 0,
      invalid_scans: 0,
      tickets_sold: tickets_sold as u64,
      tickets_checked_in: 0,
      revenue_cents: 0,
      attendance_count: attendance as u64,
      categories: Vec::with_capacity(categories.len()),
    };

    for (status_str, count) in scan_counts {
      let count = count as u64;
      stats.total_scans += count;
      match decode_enum::<ScanStatus>(&status_str)? {
        ScanStatus::Success => stats.successful_scans += count,
        ScanStatus::AlreadyScanned => stats.already_scanned += count,
        ScanStatus::InvalidCode => stats.invalid_scans += count,
        _ => stats.denied_scans += count,
      }
    }

    if let Some((total_checked_in, total_revenue_cents)) = aggregates {
      stats.tickets_checked_in = u64::from(total_checked_in);
      stats.revenue_cents = total_revenue_cents;
    }

    for raw in categories {
      let category = raw.into_category()?;
      stats.categories.push(CategoryStatistics {
        category_id: category.category_id,
        name:        category.name.clone(),
        capacity:    category.capacity,
        sold:        category.sold,
        remaining:   category.remaining(),
      });
    }

    Ok(stats)
  }
}
