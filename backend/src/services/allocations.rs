//! Device allocation service
//!
//! Creating an allocation reserves device-number ranges across one or more
//! bills inside a single transaction; if any line fails, the whole request
//! rolls back and no counters move.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    validate_allocation_quantity, validate_item_name, Allocation, AllocationItemDetail,
    AllocationWithItems, CreateAllocationInput, UpdateAllocationInput,
};

use crate::error::{AppError, AppResult};
use crate::services::ledger;

/// Allocation service for issuing and dissolving device allocations
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
}

/// Stored allocation row
#[derive(Debug, FromRow)]
struct AllocationRow {
    id: Uuid,
    recipient: String,
    allocator: String,
    lab: String,
    date_of_allocation: NaiveDate,
    created_at: DateTime<Utc>,
}

impl AllocationRow {
    fn into_model(self) -> Allocation {
        Allocation {
            id: self.id,
            recipient: self.recipient,
            allocator: self.allocator,
            lab: self.lab,
            date_of_allocation: self.date_of_allocation,
            created_at: self.created_at,
        }
    }
}

/// Allocation item row joined with its bill, when the bill still exists
#[derive(Debug, FromRow)]
struct AllocationItemRow {
    id: Uuid,
    allocation_id: Uuid,
    bill_id: Uuid,
    item_name: String,
    allocated_quantity: i32,
    start_number: i32,
    end_number: i32,
    bill_no: Option<String>,
    supplier: Option<String>,
}

impl AllocationItemRow {
    fn into_detail(self) -> AllocationItemDetail {
        AllocationItemDetail {
            id: self.id,
            bill_id: self.bill_id,
            item_name: self.item_name,
            allocated_quantity: self.allocated_quantity,
            start_number: self.start_number,
            end_number: self.end_number,
            bill_no: self.bill_no,
            supplier: self.supplier,
        }
    }
}

/// Slim item row used when dissolving an allocation
#[derive(Debug, FromRow)]
struct ReleaseItemRow {
    bill_id: Uuid,
    item_name: String,
    allocated_quantity: i32,
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create an allocation, issuing device-number ranges for every line.
    ///
    /// All lines succeed or none do: the reservation runs in one transaction
    /// and any missing bill, unknown item, or stock shortfall aborts it.
    pub async fn create_allocation(
        &self,
        input: CreateAllocationInput,
    ) -> AppResult<AllocationWithItems> {
        validate_metadata(&input.recipient, &input.allocator, &input.lab)?;
        if input.items.is_empty() {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: "At least one item is required".to_string(),
            });
        }
        for item in &input.items {
            validate_item_name(&item.item_name).map_err(|msg| AppError::Validation {
                field: "items".to_string(),
                message: msg.to_string(),
            })?;
            validate_allocation_quantity(item.quantity).map_err(|msg| AppError::Validation {
                field: "items".to_string(),
                message: msg.to_string(),
            })?;
        }

        let mut tx = self.db.begin().await?;

        let allocation_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO allocations (recipient, allocator, lab, date_of_allocation)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&input.recipient)
        .bind(&input.allocator)
        .bind(&input.lab)
        .bind(input.date_of_allocation)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in input.items.iter().enumerate() {
            let bill_no = sqlx::query_scalar::<_, String>("SELECT bill_no FROM bills WHERE id = $1")
                .bind(item.bill_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Bill {}", item.bill_id)))?;

            let range = ledger::reserve(
                &mut tx,
                item.bill_id,
                &bill_no,
                &item.item_name,
                item.quantity,
                allocation_id,
            )
            .await?;

            sqlx::query(
                r#"
                INSERT INTO allocation_items
                    (allocation_id, bill_id, item_name, allocated_quantity,
                     start_number, end_number, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(allocation_id)
            .bind(item.bill_id)
            .bind(&item.item_name)
            .bind(item.quantity)
            .bind(range.start_number)
            .bind(range.end_number)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            allocation_id = %allocation_id,
            recipient = %input.recipient,
            lab = %input.lab,
            items = input.items.len(),
            "created allocation"
        );

        self.get_allocation(allocation_id).await
    }

    /// Get one allocation with its items
    pub async fn get_allocation(&self, allocation_id: Uuid) -> AppResult<AllocationWithItems> {
        let allocation = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, recipient, allocator, lab, date_of_allocation, created_at
            FROM allocations
            WHERE id = $1
            "#,
        )
        .bind(allocation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Allocation".to_string()))?
        .into_model();

        let items = self.fetch_items(&[allocation_id]).await?;
        Ok(with_items(allocation, items))
    }

    /// List all allocations, newest first
    pub async fn list_allocations(&self) -> AppResult<Vec<AllocationWithItems>> {
        let allocations = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, recipient, allocator, lab, date_of_allocation, created_at
            FROM allocations
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        self.assemble(allocations).await
    }

    /// The most recently created allocations, newest first
    pub async fn recent_allocations(&self, limit: i64) -> AppResult<Vec<AllocationWithItems>> {
        let allocations = sqlx::query_as::<_, AllocationRow>(
            r#"
            SELECT id, recipient, allocator, lab, date_of_allocation, created_at
            FROM allocations
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.assemble(allocations).await
    }

    /// Update allocation metadata.
    ///
    /// Items and their issued ranges are immutable; only who holds the
    /// devices, who issued them, where, and when can change.
    pub async fn update_allocation(
        &self,
        allocation_id: Uuid,
        input: UpdateAllocationInput,
    ) -> AppResult<AllocationWithItems> {
        if let Some(recipient) = &input.recipient {
            non_empty(recipient, "recipient")?;
        }
        if let Some(allocator) = &input.allocator {
            non_empty(allocator, "allocator")?;
        }
        if let Some(lab) = &input.lab {
            non_empty(lab, "lab")?;
        }

        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE allocations
            SET recipient = COALESCE($2, recipient),
                allocator = COALESCE($3, allocator),
                lab = COALESCE($4, lab),
                date_of_allocation = COALESCE($5, date_of_allocation)
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(allocation_id)
        .bind(&input.recipient)
        .bind(&input.allocator)
        .bind(&input.lab)
        .bind(input.date_of_allocation)
        .fetch_optional(&self.db)
        .await?;

        if updated.is_none() {
            return Err(AppError::NotFound("Allocation".to_string()));
        }

        self.get_allocation(allocation_id).await
    }

    /// Dissolve an allocation and return its units to stock.
    ///
    /// Releases are best effort: lines whose bill or item has since been
    /// deleted are skipped, and issued device numbers stay retired either
    /// way.
    pub async fn delete_allocation(&self, allocation_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM allocations WHERE id = $1)")
                .bind(allocation_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Allocation".to_string()));
        }

        let items = sqlx::query_as::<_, ReleaseItemRow>(
            r#"
            SELECT bill_id, item_name, allocated_quantity
            FROM allocation_items
            WHERE allocation_id = $1
            "#,
        )
        .bind(allocation_id)
        .fetch_all(&mut *tx)
        .await?;

        for item in &items {
            let released = ledger::release(
                &mut tx,
                item.bill_id,
                &item.item_name,
                item.allocated_quantity,
                allocation_id,
            )
            .await?;
            if !released {
                tracing::warn!(
                    allocation_id = %allocation_id,
                    bill_id = %item.bill_id,
                    item = %item.item_name,
                    "line item gone, skipping release"
                );
            }
        }

        sqlx::query("DELETE FROM allocations WHERE id = $1")
            .bind(allocation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(allocation_id = %allocation_id, items = items.len(), "deleted allocation");
        Ok(())
    }

    async fn assemble(
        &self,
        allocations: Vec<AllocationRow>,
    ) -> AppResult<Vec<AllocationWithItems>> {
        let ids: Vec<Uuid> = allocations.iter().map(|a| a.id).collect();
        let mut by_allocation: HashMap<Uuid, Vec<AllocationItemRow>> = HashMap::new();
        for item in self.fetch_items(&ids).await? {
            by_allocation
                .entry(item.allocation_id)
                .or_default()
                .push(item);
        }

        Ok(allocations
            .into_iter()
            .map(|row| {
                let allocation = row.into_model();
                let own = by_allocation.remove(&allocation.id).unwrap_or_default();
                with_items(allocation, own)
            })
            .collect())
    }

    async fn fetch_items(&self, allocation_ids: &[Uuid]) -> AppResult<Vec<AllocationItemRow>> {
        if allocation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let items = sqlx::query_as::<_, AllocationItemRow>(
            r#"
            SELECT ai.id, ai.allocation_id, ai.bill_id, ai.item_name,
                   ai.allocated_quantity, ai.start_number, ai.end_number,
                   b.bill_no, b.supplier
            FROM allocation_items ai
            LEFT JOIN bills b ON b.id = ai.bill_id
            WHERE ai.allocation_id = ANY($1)
            ORDER BY ai.position
            "#,
        )
        .bind(allocation_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }
}

fn with_items(allocation: Allocation, items: Vec<AllocationItemRow>) -> AllocationWithItems {
    AllocationWithItems {
        id: allocation.id,
        recipient: allocation.recipient,
        allocator: allocation.allocator,
        lab: allocation.lab,
        date_of_allocation: allocation.date_of_allocation,
        created_at: allocation.created_at,
        items: items
            .into_iter()
            .map(AllocationItemRow::into_detail)
            .collect(),
    }
}

fn validate_metadata(recipient: &str, allocator: &str, lab: &str) -> AppResult<()> {
    non_empty(recipient, "recipient")?;
    non_empty(allocator, "allocator")?;
    non_empty(lab, "lab")?;
    Ok(())
}

fn non_empty(value: &str, field: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation {
            field: field.to_string(),
            message: format!("{field} cannot be empty"),
        });
    }
    Ok(())
}
