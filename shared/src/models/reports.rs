//! Dashboard report models

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AllocationWithItems, BillWithItems};

/// Institution-wide device counts plus the latest allocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub total_count: i64,
    pub allocated_count: i64,
    pub available_count: i64,
    pub recent_allocations: Vec<AllocationWithItems>,
}

/// Procurement spend for one calendar year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearlyExpense {
    pub year: i32,
    pub amount: Decimal,
    pub item_count: i64,
}

/// Allocated equipment value for one lab
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabSummary {
    pub lab: String,
    pub device_count: i64,
    /// Purchase value of the allocated devices, rounded to whole units
    pub total_value: Decimal,
    /// Estimated annual upkeep, 10% of the allocated value
    pub maintenance_cost: Decimal,
}

/// A line item running low on unallocated units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LowStockItem {
    pub bill_id: Uuid,
    pub bill_no: String,
    pub name: String,
    pub quantity: i32,
    pub allocated_quantity: i32,
    pub available_quantity: i32,
    pub available_percent: Decimal,
}

/// Warranty expiry alert for a group of items bought together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarrantyAlert {
    pub id: String,
    /// Item group label, e.g. "Oscilloscope (4)"
    pub item_group: String,
    pub bill_no: String,
    pub expiry_date: NaiveDate,
    pub days_left: i64,
    pub supplier: String,
    pub contact_no: String,
}

/// Project warranty expiry alerts from recently invoiced bills.
///
/// Warranty is assumed to run one year from the invoice date. Items on a
/// bill are grouped by the first word of their name, each group's expiry is
/// staggered 15 days after the previous group's, and alerts are sorted by
/// soonest expiry. `days_left` never goes negative.
pub fn expiring_warranties(bills: &[BillWithItems], today: NaiveDate) -> Vec<WarrantyAlert> {
    let mut alerts = Vec::new();

    for (bill_index, bill) in bills.iter().enumerate() {
        let warranty_end = bill
            .invoice_date
            .checked_add_months(Months::new(12))
            .unwrap_or(bill.invoice_date);

        // Group items by the first word of their name, keeping first-seen
        // order and summing quantities.
        let mut groups: Vec<(&str, i32)> = Vec::new();
        for item in &bill.items {
            let key = item.name.split_whitespace().next().unwrap_or("");
            match groups.iter_mut().find(|(name, _)| *name == key) {
                Some((_, count)) => *count += item.quantity,
                None => groups.push((key, item.quantity)),
            }
        }

        for (group_index, (group, count)) in groups.iter().enumerate() {
            let expiry_date = warranty_end
                .checked_add_days(Days::new(group_index as u64 * 15))
                .unwrap_or(warranty_end);
            let days_left = (expiry_date - today).num_days().max(0);

            alerts.push(WarrantyAlert {
                id: format!("warranty-{bill_index}-{group_index}"),
                item_group: format!("{group} ({count})"),
                bill_no: bill.bill_no.clone(),
                expiry_date,
                days_left,
                supplier: bill.supplier.clone(),
                contact_no: bill.contact_no.clone(),
            });
        }
    }

    alerts.sort_by_key(|alert| alert.days_left);
    alerts
}
