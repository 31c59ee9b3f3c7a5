//! safeguard-core - Core library for Safeguard
//!
//! This crate contains the shared models, database layer, alert lifecycle
//! rules, and the long-poll change poller used by the Safeguard API server.

pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod poller;

pub use error::{Error, Result};
pub use models::{AlertId, AlertStatus, SosAlert};
