//! SQLite backend for the Gatehouse club store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The conditional writes run as
//! explicit transactions on that thread, which is what makes them atomic
//! with respect to every other caller.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
