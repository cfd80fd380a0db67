//! Validation utilities for the Lab Inventory Management Platform
//!
//! Input rules for procurement bills and device allocations. Handlers map
//! these errors onto the field that failed.

use rust_decimal::Decimal;

// ============================================================================
// Bill Validations
// ============================================================================

/// Validate academic year format: YYYY-YY (e.g., 2023-24)
pub fn validate_academic_year(year: &str) -> Result<(), &'static str> {
    let bytes = year.as_bytes();
    if bytes.len() != 7 {
        return Err("Academic year must be in format YYYY-YY (e.g., 2023-24)");
    }
    let digits_ok = bytes[..4].iter().all(|b| b.is_ascii_digit())
        && bytes[4] == b'-'
        && bytes[5..].iter().all(|b| b.is_ascii_digit());
    if !digits_ok {
        return Err("Academic year must be in format YYYY-YY (e.g., 2023-24)");
    }
    Ok(())
}

/// Validate supplier contact number: exactly 10 digits, no separators
pub fn validate_contact_no(contact: &str) -> Result<(), &'static str> {
    if contact.len() != 10 || !contact.chars().all(|c| c.is_ascii_digit()) {
        return Err("Contact number must be exactly 10 digits");
    }
    Ok(())
}

/// Validate a bill number is present
pub fn validate_bill_no(bill_no: &str) -> Result<(), &'static str> {
    if bill_no.trim().is_empty() {
        return Err("Bill number cannot be empty");
    }
    Ok(())
}

/// Validate an item name is present
pub fn validate_item_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Item name cannot be empty");
    }
    Ok(())
}

/// Validate a unit price is non-negative
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate a purchased quantity is at least one unit
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Quantity must be at least 1");
    }
    Ok(())
}

// ============================================================================
// Allocation Validations
// ============================================================================

/// Validate an allocation requests at least one device
pub fn validate_allocation_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Allocated quantity must be at least 1");
    }
    Ok(())
}

// ============================================================================
// Stock Level Helpers
// ============================================================================

/// Percentage of a line item's stock still available for allocation
pub fn available_percent(quantity: i32, allocated_quantity: i32) -> Decimal {
    if quantity <= 0 {
        return Decimal::ZERO;
    }
    Decimal::from(quantity - allocated_quantity) * Decimal::from(100) / Decimal::from(quantity)
}

/// A line item is low on stock when under 20% of its units remain
pub fn is_low_stock(quantity: i32, allocated_quantity: i32) -> bool {
    quantity > 0 && available_percent(quantity, allocated_quantity) < Decimal::from(20)
}
