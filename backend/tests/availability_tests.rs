//! Stock availability projection tests
//!
//! Tests for the per-item availability view the allocation form works from:
//! - every line item appears, including fully allocated ones
//! - entries group by item name across bills, in bill order

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{line_total, project_availability, BillLineItem, BillType, BillWithItems};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Helper to build a line item
fn item(name: &str, quantity: i32, allocated: i32) -> BillLineItem {
    BillLineItem {
        id: Uuid::new_v4(),
        bill_id: Uuid::new_v4(),
        name: name.to_string(),
        description: String::new(),
        unit_price: dec("250.00"),
        quantity,
        total_price: line_total(dec("250.00"), quantity),
        allocated_quantity: allocated,
        last_allocated_number: allocated,
    }
}

/// Helper to build a bill around some line items
fn bill(bill_no: &str, items: Vec<BillLineItem>) -> BillWithItems {
    BillWithItems {
        id: Uuid::new_v4(),
        bill_type: BillType::Purchase,
        academic_year: "2024-25".to_string(),
        bill_no: bill_no.to_string(),
        invoice_date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
        supplier: "Lab Supplies Co".to_string(),
        contact_no: "9876543210".to_string(),
        bill_pdf_path: None,
        pdf_url: None,
        created_at: Utc.with_ymd_and_hms(2024, 7, 15, 9, 0, 0).unwrap(),
        items,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test a single bill projects one entry per line item
    #[test]
    fn test_single_bill_projection() {
        let bills = vec![bill(
            "INV-001",
            vec![item("Oscilloscope", 10, 4), item("Multimeter", 20, 0)],
        )];

        let availability = project_availability(&bills);
        assert_eq!(availability.len(), 2);

        let scopes = &availability["Oscilloscope"];
        assert_eq!(scopes.len(), 1);
        assert_eq!(scopes[0].bill_no, "INV-001");
        assert_eq!(scopes[0].total_quantity, 10);
        assert_eq!(scopes[0].available_quantity, 6);
        assert_eq!(scopes[0].last_allocated_number, 4);
    }

    /// Test fully allocated items still appear
    #[test]
    fn test_exhausted_items_included() {
        let bills = vec![bill("INV-001", vec![item("Oscilloscope", 5, 5)])];

        let availability = project_availability(&bills);
        let entries = &availability["Oscilloscope"];

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].available_quantity, 0);
    }

    /// Test the same item on two bills keeps bill order
    #[test]
    fn test_same_item_across_bills_keeps_order() {
        let bills = vec![
            bill("INV-001", vec![item("Multimeter", 10, 10)]),
            bill("INV-002", vec![item("Multimeter", 15, 3)]),
        ];

        let availability = project_availability(&bills);
        let entries = &availability["Multimeter"];

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].bill_no, "INV-001");
        assert_eq!(entries[0].available_quantity, 0);
        assert_eq!(entries[1].bill_no, "INV-002");
        assert_eq!(entries[1].available_quantity, 12);
    }

    /// Test item names come out alphabetically
    #[test]
    fn test_names_sorted_alphabetically() {
        let bills = vec![bill(
            "INV-001",
            vec![
                item("Soldering Iron", 5, 0),
                item("Bench Supply", 3, 0),
                item("Multimeter", 8, 0),
            ],
        )];

        let availability = project_availability(&bills);
        let names: Vec<&String> = availability.keys().collect();

        assert_eq!(names, vec!["Bench Supply", "Multimeter", "Soldering Iron"]);
    }

    /// Test no bills projects an empty map
    #[test]
    fn test_no_bills_empty_map() {
        assert!(project_availability(&[]).is_empty());
    }

    /// Test a bill with no items contributes nothing
    #[test]
    fn test_bill_without_items() {
        let bills = vec![bill("INV-001", Vec::new())];
        assert!(project_availability(&bills).is_empty());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for item names drawn from a small pool, so collisions
    /// across bills actually happen
    fn name_strategy() -> impl Strategy<Value = &'static str> {
        prop_oneof![
            Just("Oscilloscope"),
            Just("Multimeter"),
            Just("Bench Supply"),
            Just("Soldering Iron"),
        ]
    }

    /// Strategy for a bill's worth of line items
    fn items_strategy() -> impl Strategy<Value = Vec<(&'static str, i32, i32)>> {
        prop::collection::vec(
            (name_strategy(), 1i32..=50, 0i32..=50)
                .prop_map(|(name, quantity, allocated)| (name, quantity, allocated.min(quantity))),
            0..5
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every line item lands in the projection exactly once
        #[test]
        fn prop_every_line_item_projected(
            bills_spec in prop::collection::vec(items_strategy(), 0..6)
        ) {
            let bills: Vec<BillWithItems> = bills_spec
                .iter()
                .enumerate()
                .map(|(i, items)| {
                    bill(
                        &format!("INV-{i:03}"),
                        items.iter().map(|(n, q, a)| item(n, *q, *a)).collect(),
                    )
                })
                .collect();

            let availability = project_availability(&bills);

            let total_items: usize = bills.iter().map(|b| b.items.len()).sum();
            let total_entries: usize = availability.values().map(Vec::len).sum();
            prop_assert_eq!(total_entries, total_items);

            // Available units always reconcile with the counters
            for entries in availability.values() {
                for entry in entries {
                    prop_assert!(entry.available_quantity >= 0);
                    prop_assert!(entry.available_quantity <= entry.total_quantity);
                }
            }
        }
    }
}
