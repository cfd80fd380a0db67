//! Device and recurring item catalog service
//!
//! The catalog feeds the bill entry dropdowns: device names for purchase
//! bills, recurring item names for consumables.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    validate_item_name, CreateDeviceInput, CreateRecurringItemInput, Device, DevicesAndItems,
    RecurringItem,
};

use crate::error::{AppError, AppResult};

/// Catalog service for registered device and recurring item names
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Stored catalog row, shared by both registries
#[derive(Debug, FromRow)]
struct NameRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List registered devices, alphabetically
    pub async fn list_devices(&self) -> AppResult<Vec<Device>> {
        let rows =
            sqlx::query_as::<_, NameRow>("SELECT id, name, created_at FROM devices ORDER BY name")
                .fetch_all(&self.db)
                .await?;

        Ok(rows
            .into_iter()
            .map(|row| Device {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            })
            .collect())
    }

    /// Register a device name
    pub async fn create_device(&self, input: CreateDeviceInput) -> AppResult<Device> {
        validate_name(&input.name)?;

        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM devices WHERE name = $1)")
                .bind(&input.name)
                .fetch_one(&self.db)
                .await?;
        if taken {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, NameRow>(
            "INSERT INTO devices (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(name = %row.name, "registered device");

        Ok(Device {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        })
    }

    /// List registered recurring items, alphabetically
    pub async fn list_recurring_items(&self) -> AppResult<Vec<RecurringItem>> {
        let rows = sqlx::query_as::<_, NameRow>(
            "SELECT id, name, created_at FROM recurring_items ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RecurringItem {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            })
            .collect())
    }

    /// Register a recurring item name
    pub async fn create_recurring_item(
        &self,
        input: CreateRecurringItemInput,
    ) -> AppResult<RecurringItem> {
        validate_name(&input.name)?;

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM recurring_items WHERE name = $1)",
        )
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;
        if taken {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let row = sqlx::query_as::<_, NameRow>(
            "INSERT INTO recurring_items (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(&input.name)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(name = %row.name, "registered recurring item");

        Ok(RecurringItem {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        })
    }

    /// Both registries in one payload, for the bill entry form
    pub async fn devices_and_items(&self) -> AppResult<DevicesAndItems> {
        Ok(DevicesAndItems {
            devices: self.list_devices().await?,
            recurring_items: self.list_recurring_items().await?,
        })
    }
}

fn validate_name(name: &str) -> AppResult<()> {
    validate_item_name(name).map_err(|msg| AppError::Validation {
        field: "name".to_string(),
        message: msg.to_string(),
    })
}
