//! Domain models for the Lab Inventory Management Platform

mod allocation;
mod availability;
mod bill;
mod catalog;
mod reports;
mod stock;

pub use allocation::*;
pub use availability::*;
pub use bill::*;
pub use catalog::*;
pub use reports::*;
pub use stock::*;
