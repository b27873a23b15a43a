//! Member identity and membership records.
//!
//! A [`MemberRef`] is the stable, opaque reference to a person — the thing a
//! scan token encodes. All mutable state about the person lives on their
//! [`Membership`], which is owned by billing/admin workflows and read-only to
//! this core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── MemberRef ───────────────────────────────────────────────────────────────

/// Opaque, stable reference to a person (an account id). Never interpreted;
/// compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberRef(String);

impl MemberRef {
  pub fn new(reference: impl Into<String>) -> Self { Self(reference.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for MemberRef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for MemberRef {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Plan & status ───────────────────────────────────────────────────────────

/// The billing shape of a membership.
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
pub enum PlanKind {
  /// Monthly recurring billing.
  Recurring,
  /// Paid up front for a year.
  Annual,
  /// Never expires; `expires_at` is `None`.
  Lifetime,
}

/// Where a membership sits in its billing lifecycle. Mutated by billing and
/// admin workflows only; the scan engine treats it as read-only input.
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
pub enum MembershipStatus {
  Pending,
  Active,
  Expired,
  Cancelled,
}

// ─── Membership ──────────────────────────────────────────────────────────────

/// A person's subscription record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
  pub member:          MemberRef,
  /// Denormalized for gate display; the profile itself lives elsewhere.
  pub display_name:    String,
  pub plan:            PlanKind,
  pub status:          MembershipStatus,
  /// `None` for lifetime plans.
  pub expires_at:      Option<DateTime<Utc>>,
  pub account_blocked: bool,
  pub card_blocked:    bool,
  pub created_at:      DateTime<Utc>,
}

impl Membership {
  /// A blocked member is refused at every gate, in every scan mode, before
  /// any subscription or ticket check runs.
  pub fn is_blocked(&self) -> bool { self.account_blocked || self.card_blocked }

  /// Whether the subscription admits the member at `now`: status must be
  /// `Active` and the expiry (if any) must lie in the future.
  pub fn subscription_current(&self, now: DateTime<Utc>) -> bool {
    self.status == MembershipStatus::Active
      && self.expires_at.is_none_or(|expiry| expiry > now)
  }
}
