//! Stock ledger operations over bill line items
//!
//! Every counter update funnels through here. Callers open a transaction,
//! the ledger locks the line item row, applies the counter transition, and
//! appends a movement row in the same transaction, so the stored counters
//! and the movement log can never drift apart on a committed path.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use shared::{
    find_overlaps, fold_movements, issued_ranges, IssuedRange, LineItemState, MovementKind,
    StockError, StockMovement,
};

use crate::error::{AppError, AppResult};

/// Counter columns of one bill line item
#[derive(Debug, FromRow)]
struct CounterRow {
    id: Uuid,
    quantity: i32,
    allocated_quantity: i32,
    last_allocated_number: i32,
}

impl CounterRow {
    fn state(&self) -> LineItemState {
        LineItemState {
            quantity: self.quantity,
            allocated_quantity: self.allocated_quantity,
            last_allocated_number: self.last_allocated_number,
        }
    }
}

/// Reserve `quantity` units of `item_name` under one bill, issuing the next
/// contiguous device-number range.
///
/// The line item row stays locked for the rest of the transaction, so
/// concurrent reservations against it serialize and exactly one of two
/// competing requests for the final units can win.
pub(crate) async fn reserve(
    conn: &mut PgConnection,
    bill_id: Uuid,
    bill_no: &str,
    item_name: &str,
    quantity: i32,
    allocation_id: Uuid,
) -> AppResult<IssuedRange> {
    let row = sqlx::query_as::<_, CounterRow>(
        r#"
        SELECT id, quantity, allocated_quantity, last_allocated_number
        FROM bill_items
        WHERE bill_id = $1 AND name = $2
        FOR UPDATE
        "#,
    )
    .bind(bill_id)
    .bind(item_name)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {} in bill {}", item_name, bill_no)))?;

    let (next, range) = row.state().reserve(quantity).map_err(|e| match e {
        StockError::Insufficient {
            requested,
            available,
        } => AppError::InsufficientStock(format!(
            "Insufficient quantity for {item_name} in bill {bill_no}: requested {requested}, available {available}"
        )),
        StockError::InvalidQuantity { .. } => AppError::Validation {
            field: "quantity".to_string(),
            message: "Allocated quantity must be at least 1".to_string(),
        },
    })?;

    sqlx::query(
        "UPDATE bill_items SET allocated_quantity = $1, last_allocated_number = $2 WHERE id = $3",
    )
    .bind(next.allocated_quantity)
    .bind(next.last_allocated_number)
    .bind(row.id)
    .execute(&mut *conn)
    .await?;

    record_movement(
        conn,
        row.id,
        Some(allocation_id),
        MovementKind::Reserve,
        quantity,
        Some(range),
    )
    .await?;

    tracing::info!(
        bill_no = %bill_no,
        item = %item_name,
        quantity,
        start = range.start_number,
        end = range.end_number,
        "reserved device numbers"
    );

    Ok(range)
}

/// Return units from a dissolved allocation to stock.
///
/// The allocated count is clamped at zero and the numbering counter is left
/// alone. Returns `false` when the referenced line item no longer exists;
/// bill references on allocations are soft, so callers log and move on.
pub(crate) async fn release(
    conn: &mut PgConnection,
    bill_id: Uuid,
    item_name: &str,
    quantity: i32,
    allocation_id: Uuid,
) -> AppResult<bool> {
    let row = sqlx::query_as::<_, CounterRow>(
        r#"
        SELECT id, quantity, allocated_quantity, last_allocated_number
        FROM bill_items
        WHERE bill_id = $1 AND name = $2
        FOR UPDATE
        "#,
    )
    .bind(bill_id)
    .bind(item_name)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(false);
    };

    let next = row.state().release(quantity);
    sqlx::query("UPDATE bill_items SET allocated_quantity = $1 WHERE id = $2")
        .bind(next.allocated_quantity)
        .bind(row.id)
        .execute(&mut *conn)
        .await?;

    record_movement(
        conn,
        row.id,
        Some(allocation_id),
        MovementKind::Release,
        quantity,
        None,
    )
    .await?;

    Ok(true)
}

async fn record_movement(
    conn: &mut PgConnection,
    bill_item_id: Uuid,
    allocation_id: Option<Uuid>,
    kind: MovementKind,
    quantity: i32,
    range: Option<IssuedRange>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_movements (bill_item_id, allocation_id, movement, quantity, start_number, end_number)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(bill_item_id)
    .bind(allocation_id)
    .bind(kind.as_str())
    .bind(quantity)
    .bind(range.map(|r| r.start_number))
    .bind(range.map(|r| r.end_number))
    .execute(conn)
    .await?;
    Ok(())
}

/// Stored movement row
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    bill_item_id: Uuid,
    allocation_id: Option<Uuid>,
    movement: String,
    quantity: i32,
    start_number: Option<i32>,
    end_number: Option<i32>,
    created_at: DateTime<Utc>,
}

impl MovementRow {
    fn into_model(self) -> AppResult<StockMovement> {
        let kind = self
            .movement
            .parse::<MovementKind>()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
        Ok(StockMovement {
            id: self.id,
            bill_item_id: self.bill_item_id,
            allocation_id: self.allocation_id,
            kind,
            quantity: self.quantity,
            start_number: self.start_number,
            end_number: self.end_number,
            created_at: self.created_at,
        })
    }
}

/// Line item identity plus stored counters, for the audit pass
#[derive(Debug, FromRow)]
struct AuditItemRow {
    id: Uuid,
    bill_no: String,
    name: String,
    quantity: i32,
    allocated_quantity: i32,
    last_allocated_number: i32,
}

/// One line item whose stored counters disagree with its movement log
#[derive(Debug, Clone, Serialize)]
pub struct AuditFinding {
    pub bill_item_id: Uuid,
    pub bill_no: String,
    pub item_name: String,
    pub stored_allocated_quantity: i32,
    pub stored_last_allocated_number: i32,
    pub replayed_allocated_quantity: i32,
    pub replayed_last_allocated_number: i32,
    /// Issued ranges that share device numbers; always empty when healthy
    pub overlapping_ranges: Vec<(IssuedRange, IssuedRange)>,
}

/// Result of a full ledger audit
#[derive(Debug, Clone, Serialize)]
pub struct StockAudit {
    pub checked_items: i64,
    pub findings: Vec<AuditFinding>,
}

/// Ledger inspection service backing the stock endpoints
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Most recent stock movements, newest first
    pub async fn recent_movements(&self, limit: i64) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, bill_item_id, allocation_id, movement, quantity,
                   start_number, end_number, created_at
            FROM stock_movements
            ORDER BY seq DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(MovementRow::into_model).collect()
    }

    /// Replay every line item's movement log and report divergence from the
    /// stored counters, including double-issued device-number ranges.
    pub async fn audit(&self) -> AppResult<StockAudit> {
        let items = sqlx::query_as::<_, AuditItemRow>(
            r#"
            SELECT bi.id, b.bill_no, bi.name, bi.quantity,
                   bi.allocated_quantity, bi.last_allocated_number
            FROM bill_items bi
            JOIN bills b ON b.id = bi.bill_id
            ORDER BY b.bill_no, bi.position
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, bill_item_id, allocation_id, movement, quantity,
                   start_number, end_number, created_at
            FROM stock_movements
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_item: HashMap<Uuid, Vec<StockMovement>> = HashMap::new();
        for row in movements {
            let movement = row.into_model()?;
            by_item.entry(movement.bill_item_id).or_default().push(movement);
        }

        let mut findings = Vec::new();
        for item in &items {
            let log = by_item.get(&item.id).map(Vec::as_slice).unwrap_or(&[]);
            let replayed = fold_movements(item.quantity, log);
            let overlapping_ranges = find_overlaps(&issued_ranges(log));

            let counters_match = replayed.allocated_quantity == item.allocated_quantity
                && replayed.last_allocated_number == item.last_allocated_number;
            if counters_match && overlapping_ranges.is_empty() {
                continue;
            }

            tracing::warn!(
                bill_no = %item.bill_no,
                item = %item.name,
                stored_allocated = item.allocated_quantity,
                replayed_allocated = replayed.allocated_quantity,
                "ledger audit found divergence"
            );
            findings.push(AuditFinding {
                bill_item_id: item.id,
                bill_no: item.bill_no.clone(),
                item_name: item.name.clone(),
                stored_allocated_quantity: item.allocated_quantity,
                stored_last_allocated_number: item.last_allocated_number,
                replayed_allocated_quantity: replayed.allocated_quantity,
                replayed_last_allocated_number: replayed.last_allocated_number,
                overlapping_ranges,
            });
        }

        Ok(StockAudit {
            checked_items: items.len() as i64,
            findings,
        })
    }
}
