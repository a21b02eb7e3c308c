//! # courier-store
//!
//! SQLite persistence layer for Courier.

pub mod store;

pub use store::{StatusApply, Store};
