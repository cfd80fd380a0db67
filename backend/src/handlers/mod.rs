//! HTTP handlers for the Lab Inventory Management Platform

pub mod allocations;
pub mod availability;
pub mod bills;
pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod stock;

pub use allocations::*;
pub use availability::*;
pub use bills::*;
pub use catalog::*;
pub use dashboard::*;
pub use health::*;
pub use stock::*;
