//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use gatehouse_core::{
  event::{Event, TicketCategory},
  member::{MemberRef, Membership, MembershipStatus, PlanKind},
  scan::{NewScanRecord, ScanModeKind, ScanStatus},
  store::{
    AllocationOutcome, AttendanceOutcome, CheckInOutcome, ClubStore, NewPurchase,
  },
  ticket::{PaymentStatus, TicketPurchase},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn membership(reference: &str) -> Membership {
  Membership {
    member: MemberRef::new(reference),
    display_name: format!("Member {reference}"),
    plan: PlanKind::Annual,
    status: MembershipStatus::Active,
    expires_at: Some(Utc::now() + Duration::days(90)),
    account_blocked: false,
    card_blocked: false,
    created_at: Utc::now(),
  }
}

fn event() -> Event {
  let now = Utc::now();
  Event {
    event_id: Uuid::new_v4(),
    title: "Annual Gala".into(),
    active: true,
    starts_at: now - Duration::hours(1),
    ends_at: now + Duration::hours(5),
    created_at: now - Duration::days(30),
  }
}

fn category(event_id: Uuid, capacity: u32) -> TicketCategory {
  TicketCategory {
    category_id: Uuid::new_v4(),
    event_id,
    name: "General".into(),
    price_cents: 4000,
    capacity,
    sold: 0,
    active: true,
    members_only: false,
    sales_open_at: None,
    sales_close_at: None,
  }
}

/// Seed an event plus a category with the given capacity.
async fn seed(s: &SqliteStore, capacity: u32) -> (Uuid, Uuid) {
  let ev = event();
  let event_id = ev.event_id;
  s.put_event(ev).await.unwrap();
  let cat = category(event_id, capacity);
  let category_id = cat.category_id;
  s.put_category(cat).await.unwrap();
  (event_id, category_id)
}

fn purchase_input(
  reference: &str,
  event_id: Uuid,
  category_id: Uuid,
  quantity: u32,
  number: &str,
) -> NewPurchase {
  NewPurchase {
    member: MemberRef::new(reference),
    event_id,
    category_id,
    quantity,
    ticket_number: number.to_owned(),
  }
}

async fn allocate_one(
  s: &SqliteStore,
  reference: &str,
  event_id: Uuid,
  category_id: Uuid,
  number: &str,
) -> TicketPurchase {
  match s
    .allocate(purchase_input(reference, event_id, category_id, 1, number))
    .await
    .unwrap()
  {
    AllocationOutcome::Allocated(p) => p,
    other => panic!("allocation failed: {other:?}"),
  }
}

// ─── Memberships ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn membership_round_trip() {
  let s = store().await;
  let mut input = membership("acct-1");
  input.plan = PlanKind::Lifetime;
  input.expires_at = None;
  input.card_blocked = true;
  s.put_membership(input).await.unwrap();

  let fetched = s
    .get_membership(&MemberRef::new("acct-1"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.member, MemberRef::new("acct-1"));
  assert_eq!(fetched.plan, PlanKind::Lifetime);
  assert_eq!(fetched.status, MembershipStatus::Active);
  assert!(fetched.expires_at.is_none());
  assert!(fetched.card_blocked);
  assert!(!fetched.account_blocked);
}

#[tokio::test]
async fn get_membership_missing_returns_none() {
  let s = store().await;
  let result = s.get_membership(&MemberRef::new("ghost")).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn put_membership_is_an_upsert() {
  let s = store().await;
  s.put_membership(membership("acct-1")).await.unwrap();

  let mut update = membership("acct-1");
  update.status = MembershipStatus::Cancelled;
  s.put_membership(update).await.unwrap();

  let fetched = s
    .get_membership(&MemberRef::new("acct-1"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.status, MembershipStatus::Cancelled);
}

// ─── Events & categories ─────────────────────────────────────────────────────

#[tokio::test]
async fn event_round_trip_creates_zeroed_aggregates() {
  let s = store().await;
  let ev = event();
  let event_id = ev.event_id;
  s.put_event(ev).await.unwrap();

  let fetched = s.get_event(event_id).await.unwrap().unwrap();
  assert_eq!(fetched.event_id, event_id);
  assert!(fetched.active);

  let aggregates = s.get_event_aggregates(event_id).await.unwrap();
  assert_eq!(aggregates.total_sold, 0);
  assert_eq!(aggregates.total_revenue_cents, 0);
  assert_eq!(aggregates.total_checked_in, 0);
}

#[tokio::test]
async fn get_event_missing_returns_none() {
  let s = store().await;
  assert!(s.get_event(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn put_category_preserves_sold_counter() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 10).await;
  allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000001").await;

  // An admin edit must not reset the counter.
  let mut edited = category(event_id, 10);
  edited.category_id = category_id;
  edited.name = "General (renamed)".into();
  s.put_category(edited).await.unwrap();

  let fetched = s.get_category(category_id).await.unwrap().unwrap();
  assert_eq!(fetched.sold, 1);
  assert_eq!(fetched.name, "General (renamed)");
}

#[tokio::test]
async fn list_categories_filters_by_event() {
  let s = store().await;
  let (event_id, _) = seed(&s, 10).await;
  let (other_event, _) = seed(&s, 5).await;

  let listed = s.list_categories(event_id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].event_id, event_id);
  assert_ne!(listed[0].event_id, other_event);
}

// ─── Allocation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn allocate_commits_purchase_counter_and_aggregates() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 10).await;

  let input = purchase_input("acct-1", event_id, category_id, 3, "GH-TEST-000002");
  let AllocationOutcome::Allocated(purchase) = s.allocate(input).await.unwrap() else {
    panic!("expected allocation")
  };

  assert_eq!(purchase.quantity, 3);
  assert_eq!(purchase.amount_cents, 3 * 4000);
  assert_eq!(purchase.payment, PaymentStatus::Pending);
  assert!(!purchase.checked_in);

  let cat = s.get_category(category_id).await.unwrap().unwrap();
  assert_eq!(cat.sold, 3);

  let aggregates = s.get_event_aggregates(event_id).await.unwrap();
  assert_eq!(aggregates.total_sold, 3);
  assert_eq!(aggregates.total_revenue_cents, 3 * 4000);
}

#[tokio::test]
async fn allocate_refuses_to_exceed_capacity() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000003").await;

  let outcome = s
    .allocate(purchase_input("acct-2", event_id, category_id, 5, "GH-TEST-000004"))
    .await
    .unwrap();
  assert!(matches!(
    outcome,
    AllocationOutcome::SoldOut { sold: 1, capacity: 5 }
  ));

  // The failed attempt left no trace.
  let cat = s.get_category(category_id).await.unwrap().unwrap();
  assert_eq!(cat.sold, 1);
  assert_eq!(s.list_purchases(event_id).await.unwrap().len(), 1);
  let aggregates = s.get_event_aggregates(event_id).await.unwrap();
  assert_eq!(aggregates.total_sold, 1);
}

#[tokio::test]
async fn allocate_rejects_inactive_and_closed_categories() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;

  let mut inactive = category(event_id, 5);
  inactive.category_id = category_id;
  inactive.active = false;
  s.put_category(inactive).await.unwrap();
  let outcome = s
    .allocate(purchase_input("acct-1", event_id, category_id, 1, "GH-TEST-000005"))
    .await
    .unwrap();
  assert!(matches!(outcome, AllocationOutcome::Unavailable));

  let mut closed = category(event_id, 5);
  closed.category_id = category_id;
  closed.sales_close_at = Some(Utc::now() - Duration::hours(1));
  s.put_category(closed).await.unwrap();
  let outcome = s
    .allocate(purchase_input("acct-1", event_id, category_id, 1, "GH-TEST-000006"))
    .await
    .unwrap();
  assert!(matches!(outcome, AllocationOutcome::Unavailable));
}

#[tokio::test]
async fn allocate_rejects_category_of_another_event() {
  let s = store().await;
  let (_, category_id) = seed(&s, 5).await;
  let (other_event, _) = seed(&s, 5).await;

  let outcome = s
    .allocate(purchase_input("acct-1", other_event, category_id, 1, "GH-TEST-000007"))
    .await
    .unwrap();
  assert!(matches!(outcome, AllocationOutcome::Unavailable));
}

#[tokio::test]
async fn duplicate_ticket_number_rolls_back_cleanly() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-DUPE").await;

  let outcome = s
    .allocate(purchase_input("acct-2", event_id, category_id, 1, "GH-TEST-DUPE"))
    .await
    .unwrap();
  assert!(matches!(outcome, AllocationOutcome::NumberTaken));

  // The colliding attempt wrote nothing: counter, rows, and aggregates all
  // reflect only the first allocation.
  let cat = s.get_category(category_id).await.unwrap().unwrap();
  assert_eq!(cat.sold, 1);
  assert_eq!(s.list_purchases(event_id).await.unwrap().len(), 1);
  let aggregates = s.get_event_aggregates(event_id).await.unwrap();
  assert_eq!(aggregates.total_sold, 1);
}

#[tokio::test]
async fn concurrent_allocations_never_oversell_the_last_unit() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 1).await;

  let a = {
    let s = s.clone();
    tokio::spawn(async move {
      s.allocate(purchase_input("acct-1", event_id, category_id, 1, "GH-RACE-A"))
        .await
        .unwrap()
    })
  };
  let b = {
    let s = s.clone();
    tokio::spawn(async move {
      s.allocate(purchase_input("acct-2", event_id, category_id, 1, "GH-RACE-B"))
        .await
        .unwrap()
    })
  };

  let outcomes = [a.await.unwrap(), b.await.unwrap()];
  let allocated = outcomes
    .iter()
    .filter(|o| matches!(o, AllocationOutcome::Allocated(_)))
    .count();
  let sold_out = outcomes
    .iter()
    .filter(|o| matches!(o, AllocationOutcome::SoldOut { .. }))
    .count();
  assert_eq!((allocated, sold_out), (1, 1));

  let cat = s.get_category(category_id).await.unwrap().unwrap();
  assert_eq!(cat.sold, 1);
}

#[tokio::test]
async fn sold_always_equals_the_sum_of_committed_quantities() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 10).await;

  let handles: Vec<_> = (0..20)
    .map(|i| {
      let s = s.clone();
      tokio::spawn(async move {
        s.allocate(purchase_input(
          &format!("acct-{i}"),
          event_id,
          category_id,
          1,
          &format!("GH-SWARM-{i:02}"),
        ))
        .await
        .unwrap()
      })
    })
    .collect();

  let mut allocated = 0u32;
  for handle in handles {
    if matches!(handle.await.unwrap(), AllocationOutcome::Allocated(_)) {
      allocated += 1;
    }
  }
  assert_eq!(allocated, 10);

  let cat = s.get_category(category_id).await.unwrap().unwrap();
  assert_eq!(cat.sold, 10);

  let committed: u32 = s
    .list_purchases(event_id)
    .await
    .unwrap()
    .iter()
    .map(|p| p.quantity)
    .sum();
  assert_eq!(committed, cat.sold);
}

// ─── Check-in ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn check_in_transitions_exactly_once() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  let purchase = allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000008").await;
  s.mark_purchase_paid(purchase.purchase_id).await.unwrap();

  let CheckInOutcome::CheckedIn(first) =
    s.check_in(purchase.purchase_id).await.unwrap()
  else {
    panic!("expected a fresh check-in")
  };
  assert!(first.checked_in);
  let stamped_at = first.checked_in_at.unwrap();

  let CheckInOutcome::AlreadyCheckedIn(second) =
    s.check_in(purchase.purchase_id).await.unwrap()
  else {
    panic!("expected already-checked-in")
  };
  assert_eq!(second.checked_in_at, Some(stamped_at));

  let aggregates = s.get_event_aggregates(event_id).await.unwrap();
  assert_eq!(aggregates.total_checked_in, 1);
}

#[tokio::test]
async fn check_in_unknown_purchase_errors() {
  let s = store().await;
  let err = s.check_in(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::PurchaseNotFound(_)));
}

#[tokio::test]
async fn concurrent_check_ins_produce_one_winner() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  let purchase = allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000009").await;
  s.mark_purchase_paid(purchase.purchase_id).await.unwrap();

  let handles: Vec<_> = (0..4)
    .map(|_| {
      let s = s.clone();
      let id = purchase.purchase_id;
      tokio::spawn(async move { s.check_in(id).await.unwrap() })
    })
    .collect();

  let mut winners = 0;
  for handle in handles {
    if matches!(handle.await.unwrap(), CheckInOutcome::CheckedIn(_)) {
      winners += 1;
    }
  }
  assert_eq!(winners, 1);

  let aggregates = s.get_event_aggregates(event_id).await.unwrap();
  assert_eq!(aggregates.total_checked_in, 1);
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn attendance_is_recorded_at_most_once() {
  let s = store().await;
  let (event_id, _) = seed(&s, 5).await;
  let member = MemberRef::new("acct-1");

  let AttendanceOutcome::Recorded(first) =
    s.record_attendance(&member, event_id).await.unwrap()
  else {
    panic!("expected a fresh record")
  };

  let AttendanceOutcome::AlreadyRecorded(second) =
    s.record_attendance(&member, event_id).await.unwrap()
  else {
    panic!("expected already-recorded")
  };
  assert_eq!(second.attendance_id, first.attendance_id);
  assert_eq!(second.recorded_at, first.recorded_at);
}

#[tokio::test]
async fn concurrent_attendance_inserts_leave_one_row() {
  let s = store().await;
  let (event_id, _) = seed(&s, 5).await;

  let handles: Vec<_> = (0..4)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move {
        s.record_attendance(&MemberRef::new("acct-1"), event_id)
          .await
          .unwrap()
      })
    })
    .collect();

  let mut recorded = 0;
  for handle in handles {
    if matches!(handle.await.unwrap(), AttendanceOutcome::Recorded(_)) {
      recorded += 1;
    }
  }
  assert_eq!(recorded, 1);

  let stats = s.summarize(event_id).await.unwrap();
  assert_eq!(stats.attendance_count, 1);
}

#[tokio::test]
async fn same_member_may_attend_different_events() {
  let s = store().await;
  let (event_a, _) = seed(&s, 5).await;
  let (event_b, _) = seed(&s, 5).await;
  let member = MemberRef::new("acct-1");

  assert!(matches!(
    s.record_attendance(&member, event_a).await.unwrap(),
    AttendanceOutcome::Recorded(_)
  ));
  assert!(matches!(
    s.record_attendance(&member, event_b).await.unwrap(),
    AttendanceOutcome::Recorded(_)
  ));
}

// ─── Gate purchase lookup & payment ──────────────────────────────────────────

#[tokio::test]
async fn find_gate_purchase_ignores_pending_payment() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000010").await;

  let member = MemberRef::new("acct-1");
  assert!(s.find_gate_purchase(&member, event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn find_gate_purchase_prefers_unused_tickets() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  let member = MemberRef::new("acct-1");

  let first = allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000011").await;
  let second = allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000012").await;
  s.mark_purchase_paid(first.purchase_id).await.unwrap();
  s.mark_purchase_paid(second.purchase_id).await.unwrap();

  // Consume the first ticket; the lookup must now surface the second.
  s.check_in(first.purchase_id).await.unwrap();
  let found = s.find_gate_purchase(&member, event_id).await.unwrap().unwrap();
  assert_eq!(found.purchase_id, second.purchase_id);
  assert!(!found.checked_in);
}

#[tokio::test]
async fn mark_purchase_paid_round_trip() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 5).await;
  let purchase = allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000013").await;

  let updated = s
    .mark_purchase_paid(purchase.purchase_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.payment, PaymentStatus::Paid);

  assert!(s.mark_purchase_paid(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Scan log & statistics ───────────────────────────────────────────────────

fn scan(event_id: Option<Uuid>, reference: Option<&str>, status: ScanStatus) -> NewScanRecord {
  NewScanRecord {
    event_id,
    member: reference.map(MemberRef::new),
    operator_id: "op-1".into(),
    mode: ScanModeKind::EventWithTicket,
    status,
  }
}

#[tokio::test]
async fn recent_scans_returns_newest_first_with_limit() {
  let s = store().await;
  let (event_id, _) = seed(&s, 5).await;

  s.append_scan(scan(Some(event_id), Some("acct-1"), ScanStatus::Success))
    .await
    .unwrap();
  s.append_scan(scan(Some(event_id), Some("acct-2"), ScanStatus::NoTicket))
    .await
    .unwrap();
  s.append_scan(scan(None, None, ScanStatus::InvalidCode))
    .await
    .unwrap();

  let all = s.recent_scans(None, 10).await.unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0].status, ScanStatus::InvalidCode);

  let for_event = s.recent_scans(Some(event_id), 10).await.unwrap();
  assert_eq!(for_event.len(), 2);
  assert_eq!(for_event[0].status, ScanStatus::NoTicket);
  assert_eq!(for_event[0].member, Some(MemberRef::new("acct-2")));

  let limited = s.recent_scans(None, 1).await.unwrap();
  assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn summarize_counts_match_the_ledger() {
  let s = store().await;
  let (event_id, category_id) = seed(&s, 10).await;

  let purchase = allocate_one(&s, "acct-1", event_id, category_id, "GH-TEST-000014").await;
  allocate_one(&s, "acct-2", event_id, category_id, "GH-TEST-000015").await;
  s.mark_purchase_paid(purchase.purchase_id).await.unwrap();
  s.check_in(purchase.purchase_id).await.unwrap();
  s.record_attendance(&MemberRef::new("acct-3"), event_id)
    .await
    .unwrap();

  for status in [
    ScanStatus::Success,
    ScanStatus::AlreadyScanned,
    ScanStatus::Blocked,
    ScanStatus::NoTicket,
    ScanStatus::InvalidCode,
  ] {
    s.append_scan(scan(Some(event_id), Some("acct-1"), status))
      .await
      .unwrap();
  }
  // A scan of another gate must not leak into this event's rollup.
  s.append_scan(scan(None, Some("acct-1"), ScanStatus::Success))
    .await
    .unwrap();

  let stats = s.summarize(event_id).await.unwrap();
  assert_eq!(stats.total_scans, 5);
  assert_eq!(stats.successful_scans, 1);
  assert_eq!(stats.already_scanned, 1);
  assert_eq!(stats.denied_scans, 2);
  assert_eq!(stats.invalid_scans, 1);
  assert_eq!(stats.tickets_sold, 2);
  assert_eq!(stats.tickets_checked_in, 1);
  assert_eq!(stats.revenue_cents, 2 * 4000);
  assert_eq!(stats.attendance_count, 1);

  assert_eq!(stats.categories.len(), 1);
  assert_eq!(stats.categories[0].sold, 2);
  assert_eq!(stats.categories[0].remaining, 8);
}

#[tokio::test]
async fn summarize_unknown_event_errors() {
  let s = store().await;
  let err = s.summarize(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::EventNotFound(_)));
}
