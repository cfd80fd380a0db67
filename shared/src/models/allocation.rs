//! Device allocation models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::IssuedRange;

/// A device allocation to a lab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub recipient: String,
    pub allocator: String,
    pub lab: String,
    pub date_of_allocation: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One allocated line of devices, tied to the bill it was purchased under
///
/// `bill_id` is a soft reference: the bill may have been deleted since.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationItem {
    pub id: Uuid,
    pub allocation_id: Uuid,
    pub bill_id: Uuid,
    pub item_name: String,
    pub allocated_quantity: i32,
    pub start_number: i32,
    pub end_number: i32,
}

impl AllocationItem {
    /// The device-number range issued to this line
    pub fn range(&self) -> IssuedRange {
        IssuedRange::new(self.start_number, self.end_number)
    }
}

/// Allocation item enriched with bill details for display
///
/// `bill_no` and `supplier` are `None` when the referenced bill no longer
/// exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationItemDetail {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub item_name: String,
    pub allocated_quantity: i32,
    pub start_number: i32,
    pub end_number: i32,
    pub bill_no: Option<String>,
    pub supplier: Option<String>,
}

/// An allocation together with its items, as served by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationWithItems {
    pub id: Uuid,
    pub recipient: String,
    pub allocator: String,
    pub lab: String,
    pub date_of_allocation: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub items: Vec<AllocationItemDetail>,
}

/// One requested line in an allocation create request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationItemInput {
    pub bill_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
}

/// Request payload for creating an allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAllocationInput {
    pub recipient: String,
    pub allocator: String,
    pub lab: String,
    pub date_of_allocation: NaiveDate,
    pub items: Vec<AllocationItemInput>,
}

/// Request payload for updating an allocation
///
/// Only metadata can change; the allocated items and their device-number
/// ranges are immutable once issued.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAllocationInput {
    pub recipient: Option<String>,
    pub allocator: Option<String>,
    pub lab: Option<String>,
    pub date_of_allocation: Option<NaiveDate>,
}
