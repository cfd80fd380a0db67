//! Shared types and models for the Lab Inventory Management Platform
//!
//! This crate contains types shared between the backend server and other
//! components of the system, plus the pure stock-ledger logic the
//! allocation engine is built on.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
