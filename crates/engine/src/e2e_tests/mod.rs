//! End-to-end round tests.
//!
//! These tests drive the full App (every use case) over a temporary SQLite
//! store, with a scripted narrative generator standing in for the network.

mod e2e_helpers;

pub use e2e_helpers::*;
