//! Modelhouse backend service library.
//!
//! The payment core lives in [`gateway`] (card gateway transport),
//! [`charges`] (the charge state machine and pending-charge sessions) and
//! [`ledger`] (balance credit, transaction history, withdrawal policy).
//! The remaining modules are the HTTP surface and the usual plumbing.

pub mod api;
pub mod charges;
pub mod config;
pub mod database;
pub mod error;
pub mod gateway;
pub mod health;
pub mod ledger;
pub mod logging;
pub mod middleware;
