//! [`Gatekeeper`] — the scan-resolution engine.
//!
//! Turns a raw scanned token plus a gate's [`ScanMode`] into a
//! [`ScanResult`]. The decision is a sequential chain: the first matching
//! rule wins and is terminal. Block flags are checked before any
//! subscription or ticket rule in every mode — a blocked member is always
//! refused.
//!
//! The only durable writes are the winning side effects: one attendance row
//! (ticketless mode) or one check-in transition (ticketed mode). Denials
//! write nothing. The audit append happens after the decision and never
//! gates it.

use std::sync::Arc;

use chrono::Utc;
use gatehouse_core::{
  member::MemberRef,
  scan::{NewScanRecord, ScanMode, ScanResult, ScanStatus},
  store::{AttendanceOutcome, CheckInOutcome, ClubStore},
};
use uuid::Uuid;

use crate::error::Error;

/// The scan-resolution engine. Cheap to clone; holds only the store handle.
#[derive(Clone)]
pub struct Gatekeeper<S> {
  store: Arc<S>,
}

impl<S> Gatekeeper<S>
where
  S: ClubStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Resolve a scanned token into an access decision.
  ///
  /// `operator_id` identifies who performed the scan; it is recorded in the
  /// audit log and has no behavioral effect. A store failure surfaces as
  /// `Err` — distinct from every denial — so the caller retries instead of
  /// refusing entry.
  pub async fn resolve(
    &self,
    token: &str,
    mode: ScanMode,
    operator_id: &str,
  ) -> Result<ScanResult, Error> {
    let (member, result) = match gatehouse_token::decode(token) {
      Ok(member) => {
        let result = self.decide(&member, mode).await?;
        (Some(member), result)
      }
      Err(e) => {
        tracing::debug!(error = %e, "scan token failed to decode");
        (None, ScanResult::bare(ScanStatus::InvalidCode))
      }
    };

    tracing::debug!(
      status = %result.status,
      mode = %mode.kind(),
      operator_id,
      "scan resolved"
    );
    self.append_audit(member, mode, &result, operator_id).await;

    Ok(result)
  }

  /// Run the decision chain for a decoded member. First match is terminal.
  async fn decide(
    &self,
    member: &MemberRef,
    mode: ScanMode,
  ) -> Result<ScanResult, Error> {
    let membership = match self
      .store
      .get_membership(member)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?
    {
      Some(m) => m,
      None => return Ok(ScanResult::bare(ScanStatus::MemberNotFound)),
    };

    // Block flags trump everything, including a valid ticket.
    if membership.is_blocked() {
      return Ok(ScanResult::for_member(ScanStatus::Blocked, membership));
    }

    match mode {
      ScanMode::SubscriptionOnly => {
        let status = if membership.subscription_current(Utc::now()) {
          ScanStatus::Success
        } else {
          ScanStatus::SubscriptionInactive
        };
        Ok(ScanResult::for_member(status, membership))
      }

      ScanMode::EventAttendance { event_id } => {
        if !self.event_open(event_id).await? {
          return Ok(ScanResult::for_member(
            ScanStatus::EventUnavailable,
            membership,
          ));
        }

        let outcome = self
          .store
          .record_attendance(member, event_id)
          .await
          .map_err(|e| Error::Store(Box::new(e)))?;

        let (status, attendance) = match outcome {
          AttendanceOutcome::Recorded(a) => (ScanStatus::Success, a),
          AttendanceOutcome::AlreadyRecorded(a) => (ScanStatus::AlreadyScanned, a),
        };
        let mut result = ScanResult::for_member(status, membership);
        result.attendance = Some(attendance);
        Ok(result)
      }

      ScanMode::EventWithTicket { event_id } => {
        if !self.event_open(event_id).await? {
          return Ok(ScanResult::for_member(
            ScanStatus::EventUnavailable,
            membership,
          ));
        }

        let purchase = match self
          .store
          .find_gate_purchase(member, event_id)
          .await
          .map_err(|e| Error::Store(Box::new(e)))?
        {
          Some(p) => p,
          None => {
            return Ok(ScanResult::for_member(ScanStatus::NoTicket, membership));
          }
        };

        if purchase.checked_in {
          let mut result =
            ScanResult::for_member(ScanStatus::AlreadyScanned, membership);
          result.purchase = Some(purchase);
          return Ok(result);
        }

        // The read above can be stale under a race; the store re-verifies
        // `checked_in == false` at commit time.
        let outcome = self
          .store
          .check_in(purchase.purchase_id)
          .await
          .map_err(|e| Error::Store(Box::new(e)))?;

        let (status, purchase) = match outcome {
          CheckInOutcome::CheckedIn(p) => (ScanStatus::Success, p),
          CheckInOutcome::AlreadyCheckedIn(p) => (ScanStatus::AlreadyScanned, p),
        };
        let mut result = ScanResult::for_member(status, membership);
        result.purchase = Some(purchase);
        Ok(result)
      }
    }
  }

  async fn event_open(&self, event_id: Uuid) -> Result<bool, Error> {
    let event = self
      .store
      .get_event(event_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    Ok(event.is_some_and(|e| e.is_open(Utc::now())))
  }

  /// Append the scan to the audit log. Failures are logged and swallowed;
  /// the decision already stands.
  async fn append_audit(
    &self,
    member: Option<MemberRef>,
    mode: ScanMode,
    result: &ScanResult,
    operator_id: &str,
  ) {
    let record = NewScanRecord {
      event_id: mode.event_id(),
      member,
      operator_id: operator_id.to_owned(),
      mode: mode.kind(),
      status: result.status,
    };
    if let Err(e) = self.store.append_scan(record).await {
      tracing::warn!(error = %e, "failed to append scan audit record");
    }
  }
}

#[cfg(test)]
mod tests {
  use gatehouse_core::{member::MembershipStatus, scan::ScanModeKind};
  use gatehouse_token::encode;

  use super::*;
  use crate::testing::{self, MemoryStore};

  const OPERATOR: &str = "op-7";

  async fn gatekeeper() -> (Arc<MemoryStore>, Gatekeeper<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    (store.clone(), Gatekeeper::new(store))
  }

  #[tokio::test]
  async fn malformed_token_is_invalid_code_regardless_of_store() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();

    let result = gk
      .resolve("WRONGPREFIX:abc123", ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::InvalidCode);
    assert!(result.membership.is_none());
  }

  #[tokio::test]
  async fn unknown_member_is_not_found() {
    let (_store, gk) = gatekeeper().await;
    let token = encode(&MemberRef::new("nobody"));
    let result = gk
      .resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::MemberNotFound);
  }

  #[tokio::test]
  async fn lifetime_member_passes_subscription_gate() {
    let (store, gk) = gatekeeper().await;
    // Active with no expiry — the lifetime shape.
    store.put_membership(testing::active_member("m-1")).await.unwrap();

    let token = encode(&MemberRef::new("m-1"));
    let result = gk
      .resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::Success);
    assert_eq!(
      result.membership.unwrap().member,
      MemberRef::new("m-1")
    );
    // No attendance or ticket side effect in this mode.
    assert!(result.attendance.is_none());
    assert!(result.purchase.is_none());
  }

  #[tokio::test]
  async fn lapsed_subscription_is_inactive() {
    let (store, gk) = gatekeeper().await;
    let mut membership = testing::active_member("m-1");
    membership.status = MembershipStatus::Expired;
    store.put_membership(membership).await.unwrap();

    let token = encode(&MemberRef::new("m-1"));
    let result = gk
      .resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::SubscriptionInactive);
  }

  #[tokio::test]
  async fn blocked_member_is_refused_before_ticket_checks() {
    let (store, gk) = gatekeeper().await;
    let event = testing::open_event();
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();

    let mut membership = testing::active_member("m-1");
    membership.account_blocked = true;
    store.put_membership(membership).await.unwrap();

    // An otherwise perfectly valid paid ticket.
    let purchase =
      testing::paid_purchase(&store, "m-1", event_id).await;

    let token = encode(&MemberRef::new("m-1"));
    let result = gk
      .resolve(&token, ScanMode::EventWithTicket { event_id }, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::Blocked);

    // The ticket must be untouched.
    let after = store.get_purchase(purchase.purchase_id).await.unwrap().unwrap();
    assert!(!after.checked_in);
    assert!(after.checked_in_at.is_none());
  }

  #[tokio::test]
  async fn card_block_is_as_terminal_as_account_block() {
    let (store, gk) = gatekeeper().await;
    let mut membership = testing::active_member("m-1");
    membership.card_blocked = true;
    store.put_membership(membership).await.unwrap();

    let token = encode(&MemberRef::new("m-1"));
    let result = gk
      .resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::Blocked);
  }

  #[tokio::test]
  async fn missing_or_inactive_event_is_unavailable() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();
    let token = encode(&MemberRef::new("m-1"));

    let result = gk
      .resolve(
        &token,
        ScanMode::EventAttendance { event_id: Uuid::new_v4() },
        OPERATOR,
      )
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::EventUnavailable);

    let mut event = testing::open_event();
    event.active = false;
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();

    let result = gk
      .resolve(&token, ScanMode::EventAttendance { event_id }, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::EventUnavailable);
  }

  #[tokio::test]
  async fn attendance_is_recorded_once() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();
    let event = testing::open_event();
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();

    let token = encode(&MemberRef::new("m-1"));
    let mode = ScanMode::EventAttendance { event_id };

    let first = gk.resolve(&token, mode, OPERATOR).await.unwrap();
    assert_eq!(first.status, ScanStatus::Success);
    let recorded_at = first.attendance.unwrap().recorded_at;

    let second = gk.resolve(&token, mode, OPERATOR).await.unwrap();
    assert_eq!(second.status, ScanStatus::AlreadyScanned);
    // The original record is returned, not a new one.
    assert_eq!(second.attendance.unwrap().recorded_at, recorded_at);
  }

  #[tokio::test]
  async fn ticket_gate_without_purchase_is_no_ticket() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();
    let event = testing::open_event();
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();

    let token = encode(&MemberRef::new("m-1"));
    let result = gk
      .resolve(&token, ScanMode::EventWithTicket { event_id }, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::NoTicket);
  }

  #[tokio::test]
  async fn pending_payment_does_not_admit() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-2")).await.unwrap();
    let event = testing::open_event();
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();
    testing::pending_purchase(&store, "m-2", event_id).await;

    let token = encode(&MemberRef::new("m-2"));
    let result = gk
      .resolve(&token, ScanMode::EventWithTicket { event_id }, OPERATOR)
      .await
      .unwrap();
    assert_eq!(result.status, ScanStatus::NoTicket);
  }

  #[tokio::test]
  async fn paid_ticket_checks_in_exactly_once() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();
    let event = testing::open_event();
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();
    testing::paid_purchase(&store, "m-1", event_id).await;

    let token = encode(&MemberRef::new("m-1"));
    let mode = ScanMode::EventWithTicket { event_id };

    let first = gk.resolve(&token, mode, OPERATOR).await.unwrap();
    assert_eq!(first.status, ScanStatus::Success);
    let purchase = first.purchase.unwrap();
    assert!(purchase.checked_in);
    let checked_in_at = purchase.checked_in_at.unwrap();

    let second = gk.resolve(&token, mode, OPERATOR).await.unwrap();
    assert_eq!(second.status, ScanStatus::AlreadyScanned);
    // The original instant is preserved for display.
    assert_eq!(second.purchase.unwrap().checked_in_at, Some(checked_in_at));

    let aggregates = store.get_event_aggregates(event_id).await.unwrap();
    assert_eq!(aggregates.total_checked_in, 1);
  }

  #[tokio::test]
  async fn store_failure_is_an_error_not_a_denial() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();
    store.fail_from_now_on();

    let token = encode(&MemberRef::new("m-1"));
    let outcome = gk
      .resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await;
    assert!(matches!(outcome, Err(Error::Store(_))));
  }

  #[tokio::test]
  async fn every_decision_lands_in_the_audit_log() {
    let (store, gk) = gatekeeper().await;
    store.put_membership(testing::active_member("m-1")).await.unwrap();
    let token = encode(&MemberRef::new("m-1"));

    gk.resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    gk.resolve("garbage", ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();

    let scans = store.recent_scans(None, 10).await.unwrap();
    assert_eq!(scans.len(), 2);
    // Newest first.
    assert_eq!(scans[0].status, ScanStatus::InvalidCode);
    assert!(scans[0].member.is_none());
    assert_eq!(scans[1].status, ScanStatus::Success);
    assert_eq!(scans[1].member, Some(MemberRef::new("m-1")));
    assert_eq!(scans[1].mode, ScanModeKind::SubscriptionOnly);
    assert_eq!(scans[1].operator_id, OPERATOR);
  }

  #[tokio::test]
  async fn denial_paths_write_nothing_durable() {
    let (store, gk) = gatekeeper().await;
    let mut membership = testing::active_member("m-1");
    membership.status = MembershipStatus::Cancelled;
    store.put_membership(membership).await.unwrap();
    let event = testing::open_event();
    let event_id = event.event_id;
    store.put_event(event).await.unwrap();

    let token = encode(&MemberRef::new("m-1"));
    gk.resolve(&token, ScanMode::SubscriptionOnly, OPERATOR)
      .await
      .unwrap();
    gk.resolve(&token, ScanMode::EventWithTicket { event_id }, OPERATOR)
      .await
      .unwrap();

    assert_eq!(store.attendance_count().await, 0);
    assert!(store.list_purchases(event_id).await.unwrap().is_empty());
    let aggregates = store.get_event_aggregates(event_id).await.unwrap();
    assert_eq!(aggregates.total_checked_in, 0);
  }
}
