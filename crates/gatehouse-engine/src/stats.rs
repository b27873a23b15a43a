//! [`Tally`] — read-only event rollups.
//!
//! Nothing here writes, so there is no concurrency concern; the store-side
//! aggregation is free to fold however it likes as long as the counts match
//! the ledger exactly.

use std::sync::Arc;

use gatehouse_core::{stats::EventStatistics, store::ClubStore};
use uuid::Uuid;

use crate::error::Error;

/// The statistics front-end. Cheap to clone; holds only the store handle.
#[derive(Clone)]
pub struct Tally<S> {
  store: Arc<S>,
}

impl<S> Tally<S>
where
  S: ClubStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub async fn summarize(&self, event_id: Uuid) -> Result<EventStatistics, Error> {
    let stats = self
      .store
      .summarize(event_id)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    tracing::debug!(
      %event_id,
      total_scans = stats.total_scans,
      tickets_sold = stats.tickets_sold,
      "event summarized"
    );
    Ok(stats)
  }
}

#[cfg(test)]
mod tests {
  use gatehouse_core::scan::ScanMode;
  use gatehouse_token::encode;

  use super::*;
  use crate::{
    allocate::{BoxOffice, PurchaseRequest},
    resolve::Gatekeeper,
    testing::{self, MemoryStore},
  };

  #[tokio::test]
  async fn counts_match_the_ledger() {
    let store = Arc::new(MemoryStore::default());
    let (event_id, category_id) = testing::seed_event_with_category(&store, 10).await;

    for reference in ["m-1", "m-2", "m-3"] {
      store.put_membership(testing::active_member(reference)).await.unwrap();
    }

    let office = BoxOffice::new(store.clone());
    for buyer in ["m-1", "m-2"] {
      let purchase = office
        .purchase(PurchaseRequest {
          event_id,
          category_id,
          buyer: buyer.into(),
          quantity: 2,
        })
        .await
        .unwrap();
      store.mark_purchase_paid(purchase.purchase_id).await.unwrap();
    }

    let gk = Gatekeeper::new(store.clone());
    let mode = ScanMode::EventWithTicket { event_id };
    // m-1 admitted once, then refused as already scanned; m-3 has no ticket;
    // one malformed code.
    let m1 = encode(&"m-1".into());
    gk.resolve(&m1, mode, "op-1").await.unwrap();
    gk.resolve(&m1, mode, "op-1").await.unwrap();
    gk.resolve(&encode(&"m-3".into()), mode, "op-1").await.unwrap();
    gk.resolve("not-a-token", mode, "op-1").await.unwrap();

    let stats = Tally::new(store.clone()).summarize(event_id).await.unwrap();
    assert_eq!(stats.total_scans, 4);
    assert_eq!(stats.successful_scans, 1);
    assert_eq!(stats.already_scanned, 1);
    assert_eq!(stats.denied_scans, 1);
    assert_eq!(stats.invalid_scans, 1);
    assert_eq!(
      stats.total_scans,
      stats.successful_scans
        + stats.already_scanned
        + stats.denied_scans
        + stats.invalid_scans
    );

    assert_eq!(stats.tickets_sold, 4);
    assert_eq!(stats.tickets_checked_in, 1);
    assert_eq!(stats.attendance_count, 0);

    assert_eq!(stats.categories.len(), 1);
    let category = &stats.categories[0];
    assert_eq!(category.sold, 4);
    assert_eq!(category.remaining, category.capacity - category.sold);
  }

  #[tokio::test]
  async fn unknown_event_is_an_error() {
    let store = Arc::new(MemoryStore::default());
    let outcome = Tally::new(store).summarize(Uuid::new_v4()).await;
    assert!(matches!(outcome, Err(Error::Store(_))));
  }
}
