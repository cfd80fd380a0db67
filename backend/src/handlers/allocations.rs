//! HTTP handlers for device allocation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::{AllocationWithItems, CreateAllocationInput, UpdateAllocationInput};

use crate::error::AppResult;
use crate::services::AllocationService;
use crate::AppState;

/// List all allocations with their items
pub async fn list_allocations(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AllocationWithItems>>> {
    let service = AllocationService::new(state.db.clone());
    let allocations = service.list_allocations().await?;
    Ok(Json(allocations))
}

/// Create an allocation, issuing device-number ranges
pub async fn create_allocation(
    State(state): State<AppState>,
    Json(input): Json<CreateAllocationInput>,
) -> AppResult<(StatusCode, Json<AllocationWithItems>)> {
    let service = AllocationService::new(state.db.clone());
    let allocation = service.create_allocation(input).await?;
    Ok((StatusCode::CREATED, Json(allocation)))
}

/// Get a specific allocation
pub async fn get_allocation(
    State(state): State<AppState>,
    Path(allocation_id): Path<Uuid>,
) -> AppResult<Json<AllocationWithItems>> {
    let service = AllocationService::new(state.db.clone());
    let allocation = service.get_allocation(allocation_id).await?;
    Ok(Json(allocation))
}

/// Update allocation metadata
pub async fn update_allocation(
    State(state): State<AppState>,
    Path(allocation_id): Path<Uuid>,
    Json(input): Json<UpdateAllocationInput>,
) -> AppResult<Json<AllocationWithItems>> {
    let service = AllocationService::new(state.db.clone());
    let allocation = service.update_allocation(allocation_id, input).await?;
    Ok(Json(allocation))
}

/// Dissolve an allocation, returning its units to stock
pub async fn delete_allocation(
    State(state): State<AppState>,
    Path(allocation_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = AllocationService::new(state.db.clone());
    service.delete_allocation(allocation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
