//! Name catalogs for devices and recurring items

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A device name known to the institution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A recurring consumable name known to the institution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringItem {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Request payload for registering a device name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeviceInput {
    pub name: String,
}

/// Request payload for registering a recurring item name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecurringItemInput {
    pub name: String,
}

/// Both catalogs in one response, for form dropdowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesAndItems {
    pub devices: Vec<Device>,
    pub recurring_items: Vec<RecurringItem>,
}
