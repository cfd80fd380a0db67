//! HTTP handlers for the device and recurring item catalog

use axum::{extract::State, http::StatusCode, Json};

use shared::{
    CreateDeviceInput, CreateRecurringItemInput, Device, DevicesAndItems, RecurringItem,
};

use crate::error::AppResult;
use crate::services::CatalogService;
use crate::AppState;

/// List registered devices
pub async fn list_devices(State(state): State<AppState>) -> AppResult<Json<Vec<Device>>> {
    let service = CatalogService::new(state.db.clone());
    let devices = service.list_devices().await?;
    Ok(Json(devices))
}

/// Register a device name
pub async fn create_device(
    State(state): State<AppState>,
    Json(input): Json<CreateDeviceInput>,
) -> AppResult<(StatusCode, Json<Device>)> {
    let service = CatalogService::new(state.db.clone());
    let device = service.create_device(input).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// List registered recurring items
pub async fn list_recurring_items(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RecurringItem>>> {
    let service = CatalogService::new(state.db.clone());
    let items = service.list_recurring_items().await?;
    Ok(Json(items))
}

/// Register a recurring item name
pub async fn create_recurring_item(
    State(state): State<AppState>,
    Json(input): Json<CreateRecurringItemInput>,
) -> AppResult<(StatusCode, Json<RecurringItem>)> {
    let service = CatalogService::new(state.db.clone());
    let item = service.create_recurring_item(input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Both registries in one payload, for the bill entry form
pub async fn get_devices_and_items(
    State(state): State<AppState>,
) -> AppResult<Json<DevicesAndItems>> {
    let service = CatalogService::new(state.db.clone());
    let payload = service.devices_and_items().await?;
    Ok(Json(payload))
}
