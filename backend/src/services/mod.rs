//! Business logic services for the Lab Inventory Management Platform

pub mod allocations;
pub mod availability;
pub mod bills;
pub mod catalog;
pub mod ledger;
pub mod reports;

pub use allocations::AllocationService;
pub use availability::AvailabilityService;
pub use bills::BillService;
pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use reports::ReportsService;
