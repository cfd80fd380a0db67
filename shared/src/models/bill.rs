//! Procurement bill models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LineItemState;

/// Category of a procurement bill
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BillType {
    /// One-off equipment purchase
    #[default]
    Purchase,
    /// Recurring consumables order
    Recurring,
}

impl BillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillType::Purchase => "Purchase",
            BillType::Recurring => "Recurring",
        }
    }
}

impl std::fmt::Display for BillType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BillType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Purchase" => Ok(BillType::Purchase),
            "Recurring" => Ok(BillType::Recurring),
            other => Err(format!("unknown bill type: {other}")),
        }
    }
}

/// A procurement bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub bill_type: BillType,
    /// Academic year the purchase belongs to, format YYYY-YY
    pub academic_year: String,
    pub bill_no: String,
    pub invoice_date: NaiveDate,
    pub supplier: String,
    pub contact_no: String,
    /// Stored filename of the scanned bill, if one was attached
    pub bill_pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One purchased line item on a bill
///
/// `allocated_quantity` and `last_allocated_number` are owned by the
/// allocation engine; bill edits never write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillLineItem {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub name: String,
    pub description: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
    pub allocated_quantity: i32,
    pub last_allocated_number: i32,
}

impl BillLineItem {
    /// Units still available for allocation
    pub fn available_quantity(&self) -> i32 {
        self.quantity - self.allocated_quantity
    }

    /// The ledger counters for this line item
    pub fn state(&self) -> LineItemState {
        LineItemState {
            quantity: self.quantity,
            allocated_quantity: self.allocated_quantity,
            last_allocated_number: self.last_allocated_number,
        }
    }
}

/// Line total rounded to whole paise/cents
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    (unit_price * Decimal::from(quantity)).round_dp(2)
}

/// A bill together with its line items, as served by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillWithItems {
    pub id: Uuid,
    pub bill_type: BillType,
    pub academic_year: String,
    pub bill_no: String,
    pub invoice_date: NaiveDate,
    pub supplier: String,
    pub contact_no: String,
    pub bill_pdf_path: Option<String>,
    /// Public URL of the attached PDF, when one exists
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<BillLineItem>,
}

impl BillWithItems {
    pub fn from_parts(bill: Bill, items: Vec<BillLineItem>, pdf_url: Option<String>) -> Self {
        Self {
            id: bill.id,
            bill_type: bill.bill_type,
            academic_year: bill.academic_year,
            bill_no: bill.bill_no,
            invoice_date: bill.invoice_date,
            supplier: bill.supplier,
            contact_no: bill.contact_no,
            bill_pdf_path: bill.bill_pdf_path,
            pdf_url,
            created_at: bill.created_at,
            items,
        }
    }
}

/// One line item in a bill create/update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillItemInput {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Request payload for creating a bill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBillInput {
    #[serde(default)]
    pub bill_type: BillType,
    pub academic_year: String,
    pub bill_no: String,
    pub invoice_date: NaiveDate,
    pub supplier: String,
    pub contact_no: String,
    pub items: Vec<BillItemInput>,
}

/// Request payload for updating a bill
///
/// The full metadata and line-item list are replaced; allocation counters on
/// surviving line items are preserved server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBillInput {
    #[serde(default)]
    pub bill_type: BillType,
    pub academic_year: String,
    pub bill_no: String,
    pub invoice_date: NaiveDate,
    pub supplier: String,
    pub contact_no: String,
    pub items: Vec<BillItemInput>,
}
