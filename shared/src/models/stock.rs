//! Stock ledger primitives for sequential device numbering
//!
//! Every unit received under a bill line item gets a permanent serial number
//! from a per-line-item counter. Allocations carve contiguous ranges off the
//! counter; releases return units to stock but never rewind the counter, so
//! retired numbers are never reissued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::IssuedRange;

/// Errors from ledger operations on a single line item
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("requested quantity must be at least 1 (got {requested})")]
    InvalidQuantity { requested: i32 },
    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: i32, available: i32 },
}

/// The ledger counters of one bill line item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItemState {
    /// Units purchased under the bill
    pub quantity: i32,
    /// Units currently out on allocations
    pub allocated_quantity: i32,
    /// High-water mark of issued device numbers
    pub last_allocated_number: i32,
}

impl LineItemState {
    /// Fresh state for a newly received line item
    pub fn new(quantity: i32) -> Self {
        Self {
            quantity,
            allocated_quantity: 0,
            last_allocated_number: 0,
        }
    }

    pub fn available_quantity(&self) -> i32 {
        self.quantity - self.allocated_quantity
    }

    /// Carve the next contiguous device-number range off this line item.
    ///
    /// Returns the updated counters and the issued range. The state is
    /// unchanged on error, so a failed reservation can simply be dropped.
    pub fn reserve(self, requested: i32) -> Result<(Self, IssuedRange), StockError> {
        if requested < 1 {
            return Err(StockError::InvalidQuantity { requested });
        }
        let available = self.available_quantity();
        if requested > available {
            return Err(StockError::Insufficient {
                requested,
                available,
            });
        }
        let range = IssuedRange::new(
            self.last_allocated_number + 1,
            self.last_allocated_number + requested,
        );
        let next = Self {
            quantity: self.quantity,
            allocated_quantity: self.allocated_quantity + requested,
            last_allocated_number: range.end_number,
        };
        Ok((next, range))
    }

    /// Return units to stock.
    ///
    /// The allocated count is clamped at zero and `last_allocated_number`
    /// never moves backwards: the freed units become available again under
    /// new numbers, and the released numbers are permanently retired.
    pub fn release(self, requested: i32) -> Self {
        let returned = requested.max(0);
        Self {
            allocated_quantity: (self.allocated_quantity - returned).max(0),
            ..self
        }
    }
}

/// Kind of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Reserve,
    Release,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Reserve => "reserve",
            MovementKind::Release => "release",
        }
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserve" => Ok(MovementKind::Reserve),
            "release" => Ok(MovementKind::Release),
            other => Err(format!("unknown movement kind: {other}")),
        }
    }
}

/// One append-only entry in a line item's movement log
///
/// Written in the same transaction as the counter update it records, so the
/// log can be refolded to cross-check the stored counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub bill_item_id: Uuid,
    /// The allocation that caused the movement, when it still exists
    pub allocation_id: Option<Uuid>,
    pub kind: MovementKind,
    pub quantity: i32,
    /// Issued range, present on reserve movements
    pub start_number: Option<i32>,
    pub end_number: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Replay a line item's movement log from an empty state.
///
/// The arithmetic is applied unconditionally, so folding a corrupted log
/// still terminates and the divergence shows up when the result is compared
/// against the stored counters.
pub fn fold_movements<'a, I>(quantity: i32, movements: I) -> LineItemState
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    let mut state = LineItemState::new(quantity);
    for movement in movements {
        match movement.kind {
            MovementKind::Reserve => {
                state.allocated_quantity += movement.quantity;
                state.last_allocated_number += movement.quantity;
            }
            MovementKind::Release => {
                state.allocated_quantity =
                    (state.allocated_quantity - movement.quantity.max(0)).max(0);
            }
        }
    }
    state
}

/// Device-number ranges recorded by the reserve movements of one line item
pub fn issued_ranges<'a, I>(movements: I) -> Vec<IssuedRange>
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    movements
        .into_iter()
        .filter(|m| m.kind == MovementKind::Reserve)
        .filter_map(|m| match (m.start_number, m.end_number) {
            (Some(start), Some(end)) => Some(IssuedRange::new(start, end)),
            _ => None,
        })
        .collect()
}

/// Pairs of issued ranges that share a device number.
///
/// Always empty for a healthy ledger; anything else means the counter was
/// corrupted and numbers were handed out twice.
pub fn find_overlaps(ranges: &[IssuedRange]) -> Vec<(IssuedRange, IssuedRange)> {
    let mut overlaps = Vec::new();
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if a.overlaps(b) {
                overlaps.push((*a, *b));
            }
        }
    }
    overlaps
}
