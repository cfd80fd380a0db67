//! Availability projection over bills

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BillWithItems;

/// Availability of one item name under one bill
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemAvailability {
    pub bill_id: Uuid,
    pub bill_no: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub last_allocated_number: i32,
}

/// Item name -> per-bill availability, in bill receipt order
pub type AvailabilityMap = BTreeMap<String, Vec<ItemAvailability>>;

/// Fold bills into the availability view the allocation UI works from.
///
/// Every line item appears, including fully allocated ones; callers filter
/// as needed. Entries under one name keep the order of the input bills.
pub fn project_availability(bills: &[BillWithItems]) -> AvailabilityMap {
    let mut availability = AvailabilityMap::new();
    for bill in bills {
        for item in &bill.items {
            availability
                .entry(item.name.clone())
                .or_default()
                .push(ItemAvailability {
                    bill_id: bill.id,
                    bill_no: bill.bill_no.clone(),
                    total_quantity: item.quantity,
                    available_quantity: item.available_quantity(),
                    last_allocated_number: item.last_allocated_number,
                });
        }
    }
    availability
}
