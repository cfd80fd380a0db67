//! HTTP handlers for procurement bill endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::{BillWithItems, CreateBillInput, UpdateBillInput};

use crate::error::{AppError, AppResult};
use crate::services::BillService;
use crate::AppState;

/// List all bills with their line items
pub async fn list_bills(State(state): State<AppState>) -> AppResult<Json<Vec<BillWithItems>>> {
    let service = BillService::new(state.db.clone(), state.attachments.clone());
    let bills = service.list_bills().await?;
    Ok(Json(bills))
}

/// Create a bill with its line items
pub async fn create_bill(
    State(state): State<AppState>,
    Json(input): Json<CreateBillInput>,
) -> AppResult<(StatusCode, Json<BillWithItems>)> {
    let service = BillService::new(state.db.clone(), state.attachments.clone());
    let bill = service.create_bill(input).await?;
    Ok((StatusCode::CREATED, Json(bill)))
}

/// Get a specific bill
pub async fn get_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> AppResult<Json<BillWithItems>> {
    let service = BillService::new(state.db.clone(), state.attachments.clone());
    let bill = service.get_bill(bill_id).await?;
    Ok(Json(bill))
}

/// Replace a bill's metadata and line items
pub async fn update_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
    Json(input): Json<UpdateBillInput>,
) -> AppResult<Json<BillWithItems>> {
    let service = BillService::new(state.db.clone(), state.attachments.clone());
    let bill = service.update_bill(bill_id, input).await?;
    Ok(Json(bill))
}

/// Delete a bill
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = BillService::new(state.db.clone(), state.attachments.clone());
    service.delete_bill(bill_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attach a scanned PDF to a bill, uploaded as multipart field "pdf"
pub async fn attach_bill_pdf(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<BillWithItems>> {
    let service = BillService::new(state.db.clone(), state.attachments.clone());

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationError(e.to_string()))?
    {
        if field.name() != Some("pdf") {
            continue;
        }
        let original_name = field.file_name().unwrap_or("bill.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let bill = service.attach_pdf(bill_id, &original_name, &bytes).await?;
        return Ok(Json(bill));
    }

    Err(AppError::Validation {
        field: "pdf".to_string(),
        message: "No PDF file provided".to_string(),
    })
}
