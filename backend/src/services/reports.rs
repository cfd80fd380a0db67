//! Dashboard report service
//!
//! Aggregations for the dashboard cards: device counts, yearly spend, lab
//! holdings, low stock, and warranty expiries.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{
    available_percent, expiring_warranties, is_low_stock, DeviceSummary, LabSummary, LowStockItem,
    WarrantyAlert, YearlyExpense,
};

use crate::error::AppResult;
use crate::external::AttachmentStore;
use crate::services::{AllocationService, BillService};

const RECENT_ALLOCATION_COUNT: i64 = 5;
const LOW_STOCK_LIMIT: usize = 5;
const WARRANTY_BILL_COUNT: i64 = 10;

/// Reports service backing the dashboard endpoints
#[derive(Clone)]
pub struct ReportsService {
    db: PgPool,
    attachments: AttachmentStore,
}

/// Yearly spend row
#[derive(Debug, FromRow)]
struct YearRow {
    year: i32,
    amount: Decimal,
    item_count: i64,
}

/// Per-lab aggregation row
#[derive(Debug, FromRow)]
struct LabRow {
    lab: String,
    device_count: i64,
    total_value: Decimal,
    maintenance_cost: Decimal,
}

/// Slim line item row for the low stock scan
#[derive(Debug, FromRow)]
struct StockLevelRow {
    bill_id: Uuid,
    bill_no: String,
    name: String,
    quantity: i32,
    allocated_quantity: i32,
}

impl ReportsService {
    /// Create a new ReportsService instance
    pub fn new(db: PgPool, attachments: AttachmentStore) -> Self {
        Self { db, attachments }
    }

    /// Institution-wide device counts plus the latest allocations
    pub async fn device_summary(&self) -> AppResult<DeviceSummary> {
        let (total_count, allocated_count) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COALESCE(SUM(quantity), 0), COALESCE(SUM(allocated_quantity), 0)
            FROM bill_items
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let recent_allocations = AllocationService::new(self.db.clone())
            .recent_allocations(RECENT_ALLOCATION_COUNT)
            .await?;

        Ok(DeviceSummary {
            total_count,
            allocated_count,
            available_count: total_count - allocated_count,
            recent_allocations,
        })
    }

    /// Procurement spend grouped by invoice year, oldest year first
    pub async fn yearly_expenses(&self) -> AppResult<Vec<YearlyExpense>> {
        let rows = sqlx::query_as::<_, YearRow>(
            r#"
            SELECT EXTRACT(YEAR FROM b.invoice_date)::INT AS year,
                   COALESCE(SUM(bi.total_price), 0) AS amount,
                   COUNT(bi.id) AS item_count
            FROM bills b
            JOIN bill_items bi ON bi.bill_id = b.id
            GROUP BY year
            ORDER BY year
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| YearlyExpense {
                year: row.year,
                amount: row.amount,
                item_count: row.item_count,
            })
            .collect())
    }

    /// Allocated equipment value per lab, busiest lab first.
    ///
    /// Lines whose bill or line item has since been deleted drop out of the
    /// join; the issued numbers they carried stay retired regardless.
    pub async fn lab_summary(&self) -> AppResult<Vec<LabSummary>> {
        let rows = sqlx::query_as::<_, LabRow>(
            r#"
            SELECT a.lab,
                   SUM(ai.allocated_quantity)::BIGINT AS device_count,
                   ROUND(SUM(bi.unit_price * ai.allocated_quantity)) AS total_value,
                   ROUND(SUM(bi.unit_price * ai.allocated_quantity) * 0.1) AS maintenance_cost
            FROM allocation_items ai
            JOIN allocations a ON a.id = ai.allocation_id
            JOIN bill_items bi ON bi.bill_id = ai.bill_id AND bi.name = ai.item_name
            GROUP BY a.lab
            ORDER BY device_count DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| LabSummary {
                lab: row.lab,
                device_count: row.device_count,
                total_value: row.total_value,
                maintenance_cost: row.maintenance_cost,
            })
            .collect())
    }

    /// Line items running low on unallocated units, most depleted first
    pub async fn low_stock(&self) -> AppResult<Vec<LowStockItem>> {
        let rows = sqlx::query_as::<_, StockLevelRow>(
            r#"
            SELECT bi.bill_id, b.bill_no, bi.name, bi.quantity, bi.allocated_quantity
            FROM bill_items bi
            JOIN bills b ON b.id = bi.bill_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let mut low: Vec<LowStockItem> = rows
            .into_iter()
            .filter(|row| is_low_stock(row.quantity, row.allocated_quantity))
            .map(|row| LowStockItem {
                bill_id: row.bill_id,
                bill_no: row.bill_no,
                name: row.name,
                quantity: row.quantity,
                allocated_quantity: row.allocated_quantity,
                available_quantity: row.quantity - row.allocated_quantity,
                available_percent: available_percent(row.quantity, row.allocated_quantity),
            })
            .collect();

        low.sort_by(|a, b| a.available_percent.cmp(&b.available_percent));
        low.truncate(LOW_STOCK_LIMIT);
        Ok(low)
    }

    /// Warranty expiry alerts projected from the latest invoiced bills
    pub async fn expiring_warranties(&self) -> AppResult<Vec<WarrantyAlert>> {
        let bills = BillService::new(self.db.clone(), self.attachments.clone())
            .recent_bills(WARRANTY_BILL_COUNT)
            .await?;

        Ok(expiring_warranties(&bills, Utc::now().date_naive()))
    }
}
