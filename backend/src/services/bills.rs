//! Procurement bill service
//!
//! Bills carry the line items that device numbers are issued against, so
//! edits must never touch the allocation counters: updates replace metadata
//! and line-item details while `allocated_quantity` and
//! `last_allocated_number` stay server-owned.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{
    line_total, validate_academic_year, validate_bill_no, validate_contact_no, validate_item_name,
    validate_quantity, validate_unit_price, Bill, BillItemInput, BillLineItem, BillWithItems,
    CreateBillInput, UpdateBillInput,
};

use crate::error::{AppError, AppResult};
use crate::external::AttachmentStore;

/// Bill service for procurement records and their line items
#[derive(Clone)]
pub struct BillService {
    db: PgPool,
    attachments: AttachmentStore,
}

/// Stored bill row
#[derive(Debug, FromRow)]
struct BillRow {
    id: Uuid,
    bill_type: String,
    academic_year: String,
    bill_no: String,
    invoice_date: NaiveDate,
    supplier: String,
    contact_no: String,
    bill_pdf_path: Option<String>,
    created_at: DateTime<Utc>,
}

impl BillRow {
    fn into_model(self) -> AppResult<Bill> {
        Ok(Bill {
            id: self.id,
            bill_type: self
                .bill_type
                .parse()
                .map_err(|e: String| AppError::InternalError(anyhow::anyhow!(e)))?,
            academic_year: self.academic_year,
            bill_no: self.bill_no,
            invoice_date: self.invoice_date,
            supplier: self.supplier,
            contact_no: self.contact_no,
            bill_pdf_path: self.bill_pdf_path,
            created_at: self.created_at,
        })
    }
}

/// Stored line item row
#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    bill_id: Uuid,
    name: String,
    description: String,
    unit_price: Decimal,
    quantity: i32,
    total_price: Decimal,
    allocated_quantity: i32,
    last_allocated_number: i32,
}

impl ItemRow {
    fn into_model(self) -> BillLineItem {
        BillLineItem {
            id: self.id,
            bill_id: self.bill_id,
            name: self.name,
            description: self.description,
            unit_price: self.unit_price,
            quantity: self.quantity,
            total_price: self.total_price,
            allocated_quantity: self.allocated_quantity,
            last_allocated_number: self.last_allocated_number,
        }
    }
}

/// Counters of an existing item, consulted during updates
#[derive(Debug, FromRow)]
struct ItemCounterRow {
    name: String,
    allocated_quantity: i32,
    last_allocated_number: i32,
}

impl BillService {
    /// Create a new BillService instance
    pub fn new(db: PgPool, attachments: AttachmentStore) -> Self {
        Self { db, attachments }
    }

    /// Create a bill with its line items
    pub async fn create_bill(&self, input: CreateBillInput) -> AppResult<BillWithItems> {
        validate_bill(
            &input.academic_year,
            &input.bill_no,
            &input.supplier,
            &input.contact_no,
            &input.items,
        )?;
        self.ensure_unique_bill_no(&input.bill_no, None).await?;

        let mut tx = self.db.begin().await?;

        let bill_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO bills (bill_type, academic_year, bill_no, invoice_date, supplier, contact_no)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.bill_type.as_str())
        .bind(&input.academic_year)
        .bind(&input.bill_no)
        .bind(input.invoice_date)
        .bind(&input.supplier)
        .bind(&input.contact_no)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in input.items.iter().enumerate() {
            insert_item(&mut tx, bill_id, item, position as i32).await?;
        }

        tx.commit().await?;

        tracing::info!(
            bill_id = %bill_id,
            bill_no = %input.bill_no,
            items = input.items.len(),
            "created bill"
        );

        self.get_bill(bill_id).await
    }

    /// Get one bill with its line items
    pub async fn get_bill(&self, bill_id: Uuid) -> AppResult<BillWithItems> {
        let bill = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_type, academic_year, bill_no, invoice_date,
                   supplier, contact_no, bill_pdf_path, created_at
            FROM bills
            WHERE id = $1
            "#,
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bill {}", bill_id)))?
        .into_model()?;

        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, bill_id, name, description, unit_price, quantity,
                   total_price, allocated_quantity, last_allocated_number
            FROM bill_items
            WHERE bill_id = $1
            ORDER BY position
            "#,
        )
        .bind(bill_id)
        .fetch_all(&self.db)
        .await?;

        Ok(self.assemble(bill, items.into_iter().map(ItemRow::into_model).collect()))
    }

    /// List all bills with their line items, oldest first
    pub async fn list_bills(&self) -> AppResult<Vec<BillWithItems>> {
        let bills = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_type, academic_year, bill_no, invoice_date,
                   supplier, contact_no, bill_pdf_path, created_at
            FROM bills
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        self.attach_items(bills).await
    }

    /// The most recently invoiced bills, newest first
    pub async fn recent_bills(&self, limit: i64) -> AppResult<Vec<BillWithItems>> {
        let bills = sqlx::query_as::<_, BillRow>(
            r#"
            SELECT id, bill_type, academic_year, bill_no, invoice_date,
                   supplier, contact_no, bill_pdf_path, created_at
            FROM bills
            ORDER BY invoice_date DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.attach_items(bills).await
    }

    async fn attach_items(&self, bills: Vec<BillRow>) -> AppResult<Vec<BillWithItems>> {
        let ids: Vec<Uuid> = bills.iter().map(|b| b.id).collect();
        let items = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, bill_id, name, description, unit_price, quantity,
                   total_price, allocated_quantity, last_allocated_number
            FROM bill_items
            WHERE bill_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_bill: HashMap<Uuid, Vec<BillLineItem>> = HashMap::new();
        for item in items {
            by_bill
                .entry(item.bill_id)
                .or_default()
                .push(item.into_model());
        }

        bills
            .into_iter()
            .map(|row| {
                let bill = row.into_model()?;
                let own = by_bill.remove(&bill.id).unwrap_or_default();
                Ok(self.assemble(bill, own))
            })
            .collect()
    }

    /// Replace a bill's metadata and line items.
    ///
    /// Items are matched to existing rows by name. An item with issued
    /// device numbers cannot be removed or renamed, and its quantity cannot
    /// drop below what is already allocated.
    pub async fn update_bill(
        &self,
        bill_id: Uuid,
        input: UpdateBillInput,
    ) -> AppResult<BillWithItems> {
        validate_bill(
            &input.academic_year,
            &input.bill_no,
            &input.supplier,
            &input.contact_no,
            &input.items,
        )?;
        self.ensure_unique_bill_no(&input.bill_no, Some(bill_id))
            .await?;

        let mut tx = self.db.begin().await?;

        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bills WHERE id = $1)")
                .bind(bill_id)
                .fetch_one(&mut *tx)
                .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Bill {}", bill_id)));
        }

        let existing = sqlx::query_as::<_, ItemCounterRow>(
            r#"
            SELECT name, allocated_quantity, last_allocated_number
            FROM bill_items
            WHERE bill_id = $1
            FOR UPDATE
            "#,
        )
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await?;
        let existing: HashMap<String, ItemCounterRow> = existing
            .into_iter()
            .map(|row| (row.name.clone(), row))
            .collect();

        for (name, counters) in &existing {
            let kept = input.items.iter().any(|item| &item.name == name);
            if !kept && (counters.allocated_quantity > 0 || counters.last_allocated_number > 0) {
                return Err(AppError::Validation {
                    field: "items".to_string(),
                    message: format!(
                        "Cannot remove item {}: device numbers have been issued against it",
                        name
                    ),
                });
            }
        }

        sqlx::query(
            r#"
            UPDATE bills
            SET bill_type = $2, academic_year = $3, bill_no = $4,
                invoice_date = $5, supplier = $6, contact_no = $7
            WHERE id = $1
            "#,
        )
        .bind(bill_id)
        .bind(input.bill_type.as_str())
        .bind(&input.academic_year)
        .bind(&input.bill_no)
        .bind(input.invoice_date)
        .bind(&input.supplier)
        .bind(&input.contact_no)
        .execute(&mut *tx)
        .await?;

        let kept_names: Vec<String> = input.items.iter().map(|item| item.name.clone()).collect();
        sqlx::query("DELETE FROM bill_items WHERE bill_id = $1 AND name <> ALL($2)")
            .bind(bill_id)
            .bind(&kept_names)
            .execute(&mut *tx)
            .await?;

        for (position, item) in input.items.iter().enumerate() {
            match existing.get(&item.name) {
                Some(counters) => {
                    if item.quantity < counters.allocated_quantity {
                        return Err(AppError::Validation {
                            field: "items".to_string(),
                            message: format!(
                                "Quantity for {} cannot drop below its allocated quantity ({})",
                                item.name, counters.allocated_quantity
                            ),
                        });
                    }
                    sqlx::query(
                        r#"
                        UPDATE bill_items
                        SET description = $3, unit_price = $4, quantity = $5,
                            total_price = $6, position = $7
                        WHERE bill_id = $1 AND name = $2
                        "#,
                    )
                    .bind(bill_id)
                    .bind(&item.name)
                    .bind(item.description.clone().unwrap_or_default())
                    .bind(item.unit_price)
                    .bind(item.quantity)
                    .bind(line_total(item.unit_price, item.quantity))
                    .bind(position as i32)
                    .execute(&mut *tx)
                    .await?;
                }
                None => insert_item(&mut tx, bill_id, item, position as i32).await?,
            }
        }

        tx.commit().await?;

        tracing::info!(bill_id = %bill_id, bill_no = %input.bill_no, "updated bill");

        self.get_bill(bill_id).await
    }

    /// Delete a bill and its line items.
    ///
    /// Past allocations keep their issued ranges; their lines simply lose
    /// the joined bill details.
    pub async fn delete_bill(&self, bill_id: Uuid) -> AppResult<()> {
        let pdf_path = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM bills WHERE id = $1 RETURNING bill_pdf_path",
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bill {}", bill_id)))?;

        if let Some(stored) = pdf_path {
            self.attachments.remove(&stored).await;
        }

        tracing::info!(bill_id = %bill_id, "deleted bill");
        Ok(())
    }

    /// Attach a scanned PDF to a bill, replacing any previous one
    pub async fn attach_pdf(
        &self,
        bill_id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> AppResult<BillWithItems> {
        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT bill_pdf_path FROM bills WHERE id = $1",
        )
        .bind(bill_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bill {}", bill_id)))?;

        let stored = self.attachments.save_pdf(original_name, bytes).await?;

        sqlx::query("UPDATE bills SET bill_pdf_path = $2 WHERE id = $1")
            .bind(bill_id)
            .bind(&stored)
            .execute(&self.db)
            .await?;

        if let Some(old) = previous {
            self.attachments.remove(&old).await;
        }

        tracing::info!(bill_id = %bill_id, file = %stored, "attached bill PDF");

        self.get_bill(bill_id).await
    }

    fn assemble(&self, bill: Bill, items: Vec<BillLineItem>) -> BillWithItems {
        let pdf_url = bill
            .bill_pdf_path
            .as_deref()
            .map(|stored| self.attachments.url(stored));
        BillWithItems::from_parts(bill, items, pdf_url)
    }

    async fn ensure_unique_bill_no(&self, bill_no: &str, exclude: Option<Uuid>) -> AppResult<()> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM bills WHERE bill_no = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(bill_no)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        if taken {
            return Err(AppError::DuplicateEntry("bill_no".to_string()));
        }
        Ok(())
    }
}

async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    bill_id: Uuid,
    item: &BillItemInput,
    position: i32,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_items
            (bill_id, name, description, unit_price, quantity, total_price, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(bill_id)
    .bind(&item.name)
    .bind(item.description.clone().unwrap_or_default())
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(line_total(item.unit_price, item.quantity))
    .bind(position)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn validate_bill(
    academic_year: &str,
    bill_no: &str,
    supplier: &str,
    contact_no: &str,
    items: &[BillItemInput],
) -> AppResult<()> {
    validate_academic_year(academic_year).map_err(|msg| AppError::Validation {
        field: "academic_year".to_string(),
        message: msg.to_string(),
    })?;
    validate_bill_no(bill_no).map_err(|msg| AppError::Validation {
        field: "bill_no".to_string(),
        message: msg.to_string(),
    })?;
    if supplier.trim().is_empty() {
        return Err(AppError::Validation {
            field: "supplier".to_string(),
            message: "supplier cannot be empty".to_string(),
        });
    }
    validate_contact_no(contact_no).map_err(|msg| AppError::Validation {
        field: "contact_no".to_string(),
        message: msg.to_string(),
    })?;
    if items.is_empty() {
        return Err(AppError::Validation {
            field: "items".to_string(),
            message: "At least one item is required".to_string(),
        });
    }
    for item in items {
        validate_item_name(&item.name).map_err(|msg| AppError::Validation {
            field: "items".to_string(),
            message: msg.to_string(),
        })?;
        validate_unit_price(item.unit_price).map_err(|msg| AppError::Validation {
            field: "items".to_string(),
            message: msg.to_string(),
        })?;
        validate_quantity(item.quantity).map_err(|msg| AppError::Validation {
            field: "items".to_string(),
            message: msg.to_string(),
        })?;
    }
    for (index, item) in items.iter().enumerate() {
        if items[..index].iter().any(|other| other.name == item.name) {
            return Err(AppError::Validation {
                field: "items".to_string(),
                message: format!("Duplicate item name: {}", item.name),
            });
        }
    }
    Ok(())
}
