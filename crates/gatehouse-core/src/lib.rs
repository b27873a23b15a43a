//! Core types and trait definitions for the Gatehouse entry-control engine.
//!
//! Deliberately free of HTTP and database dependencies: every other crate in
//! the workspace depends on this one, and this one depends only on the
//! serialization/time/id basics.

// Backends implement the store trait with native `async fn` (stabilised in
// Rust 1.75). Suppress the advisory lint about `Send` bounds on the returned
// futures.
#![allow(async_fn_in_trait)]

pub mod event;
pub mod member;
pub mod scan;
pub mod stats;
pub mod store;
pub mod ticket;

pub use member::MemberRef;
