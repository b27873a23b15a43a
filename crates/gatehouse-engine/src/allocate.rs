//! [`BoxOffice`] — the capacity-constrained allocation engine.
//!
//! The allocator's one hard promise: the sum of allocated quantities never
//! exceeds a category's capacity, no matter how many purchase calls race.
//! The store's [`ClubStore::allocate`] transaction is authoritative for
//! that; this layer does the fast-fail reads, the members-only rule, the
//! ticket-number generation, and the bounded retry loop around retryable
//! outcomes (number collisions, backend write conflicts).

use std::sync::Arc;

use chrono::Utc;
use gatehouse_core::{
  member::MemberRef,
  store::{AllocationOutcome, ClubStore, NewPurchase},
  ticket::TicketPurchase,
};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

use crate::error::PurchaseError;

/// Retries for retryable allocation outcomes before giving up with a
/// system error.
const MAX_ALLOCATION_ATTEMPTS: usize = 3;

/// Suffix alphabet for ticket numbers; ambiguous glyphs (0/O, 1/I/L) are
/// excluded so the code survives being read aloud at a gate.
const TICKET_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

// ─── Request ─────────────────────────────────────────────────────────────────

/// One purchase attempt against a category.
#[derive(Debug, Clone)]
pub struct PurchaseRequest {
  pub event_id:    Uuid,
  pub category_id: Uuid,
  pub buyer:       MemberRef,
  pub quantity:    u32,
}

// ─── BoxOffice ───────────────────────────────────────────────────────────────

/// The purchase engine. Cheap to clone; holds only the store handle.
#[derive(Clone)]
pub struct BoxOffice<S> {
  store: Arc<S>,
}

impl<S> BoxOffice<S>
where
  S: ClubStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Allocate `quantity` tickets, all or nothing.
  ///
  /// The pre-checks here are a fast path; activation, sales window, and
  /// capacity are re-verified against current state inside the store
  /// transaction, so two callers racing for the last unit resolve
  /// deterministically — one allocates, the other observes the updated
  /// count and is refused.
  pub async fn purchase(
    &self,
    request: PurchaseRequest,
  ) -> Result<TicketPurchase, PurchaseError> {
    if request.quantity == 0 {
      return Err(PurchaseError::CategoryUnavailable);
    }

    let category = self
      .store
      .get_category(request.category_id)
      .await
      .map_err(|e| PurchaseError::Store(Box::new(e)))?
      .ok_or(PurchaseError::CategoryUnavailable)?;

    let now = Utc::now();
    if category.event_id != request.event_id || !category.on_sale(now) {
      return Err(PurchaseError::CategoryUnavailable);
    }

    if category.members_only && !self.buyer_is_current_member(&request.buyer).await? {
      return Err(PurchaseError::CategoryUnavailable);
    }

    if category.sold + request.quantity > category.capacity {
      return Err(PurchaseError::SoldOut {
        sold:     category.sold,
        capacity: category.capacity,
      });
    }

    for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
      let input = NewPurchase {
        member:        request.buyer.clone(),
        event_id:      request.event_id,
        category_id:   request.category_id,
        quantity:      request.quantity,
        ticket_number: ticket_number(request.event_id),
      };

      let outcome = self
        .store
        .allocate(input)
        .await
        .map_err(|e| PurchaseError::Store(Box::new(e)))?;

      match outcome {
        AllocationOutcome::Allocated(purchase) => {
          tracing::info!(
            ticket_number = %purchase.ticket_number,
            quantity = purchase.quantity,
            category_id = %purchase.category_id,
            "tickets allocated"
          );
          return Ok(purchase);
        }
        AllocationOutcome::SoldOut { sold, capacity } => {
          return Err(PurchaseError::SoldOut { sold, capacity });
        }
        AllocationOutcome::Unavailable => {
          return Err(PurchaseError::CategoryUnavailable);
        }
        AllocationOutcome::NumberTaken | AllocationOutcome::Conflict => {
          tracing::debug!(attempt, "allocation attempt lost, retrying");
        }
      }
    }

    Err(PurchaseError::RetriesExhausted)
  }

  async fn buyer_is_current_member(
    &self,
    buyer: &MemberRef,
  ) -> Result<bool, PurchaseError> {
    let membership = self
      .store
      .get_membership(buyer)
      .await
      .map_err(|e| PurchaseError::Store(Box::new(e)))?;
    Ok(membership.is_some_and(|m| {
      !m.is_blocked() && m.subscription_current(Utc::now())
    }))
  }
}

// ─── Ticket numbers ──────────────────────────────────────────────────────────

/// A human-readable ticket number: `GH-<event prefix>-<random suffix>`.
///
/// The prefix is derived from the event id so a gate operator can group
/// tickets by eye; the suffix carries the collision resistance. Collisions
/// are still possible and surface as [`AllocationOutcome::NumberTaken`] —
/// never a silent overwrite.
pub fn ticket_number(event_id: Uuid) -> String {
  let digest = Sha256::digest(event_id.as_bytes());
  let prefix = hex::encode_upper(&digest[..2]);

  let mut raw = [0u8; 6];
  OsRng.fill_bytes(&mut raw);
  let suffix: String = raw
    .iter()
    .map(|b| TICKET_ALPHABET[*b as usize % TICKET_ALPHABET.len()] as char)
    .collect();

  format!("GH-{prefix}-{suffix}")
}
