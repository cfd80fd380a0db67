//! HTTP handlers for dashboard report endpoints

use axum::{extract::State, Json};

use shared::{DeviceSummary, LabSummary, LowStockItem, WarrantyAlert, YearlyExpense};

use crate::error::AppResult;
use crate::services::ReportsService;
use crate::AppState;

/// Institution-wide device counts plus the latest allocations
pub async fn get_device_summary(State(state): State<AppState>) -> AppResult<Json<DeviceSummary>> {
    let service = ReportsService::new(state.db.clone(), state.attachments.clone());
    let summary = service.device_summary().await?;
    Ok(Json(summary))
}

/// Procurement spend grouped by invoice year
pub async fn get_yearly_expenses(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<YearlyExpense>>> {
    let service = ReportsService::new(state.db.clone(), state.attachments.clone());
    let expenses = service.yearly_expenses().await?;
    Ok(Json(expenses))
}

/// Allocated equipment value per lab
pub async fn get_lab_summary(State(state): State<AppState>) -> AppResult<Json<Vec<LabSummary>>> {
    let service = ReportsService::new(state.db.clone(), state.attachments.clone());
    let labs = service.lab_summary().await?;
    Ok(Json(labs))
}

/// Line items running low on unallocated units
pub async fn get_low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<LowStockItem>>> {
    let service = ReportsService::new(state.db.clone(), state.attachments.clone());
    let items = service.low_stock().await?;
    Ok(Json(items))
}

/// Warranty expiry alerts from the latest invoiced bills
pub async fn get_expiring_warranties(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<WarrantyAlert>>> {
    let service = ReportsService::new(state.db.clone(), state.attachments.clone());
    let alerts = service.expiring_warranties().await?;
    Ok(Json(alerts))
}
