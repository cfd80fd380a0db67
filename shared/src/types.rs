//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// An inclusive range of sequential device numbers issued by one allocation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuedRange {
    pub start_number: i32,
    pub end_number: i32,
}

impl IssuedRange {
    pub fn new(start_number: i32, end_number: i32) -> Self {
        Self {
            start_number,
            end_number,
        }
    }

    /// Number of devices covered by this range
    pub fn quantity(&self) -> i32 {
        self.end_number - self.start_number + 1
    }

    /// Whether `number` falls inside this range
    pub fn contains(&self, number: i32) -> bool {
        self.start_number <= number && number <= self.end_number
    }

    /// Whether two ranges share at least one device number
    pub fn overlaps(&self, other: &IssuedRange) -> bool {
        self.start_number <= other.end_number && other.start_number <= self.end_number
    }
}
