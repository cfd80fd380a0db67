//! HTTP handlers for stock availability

use axum::{extract::State, Json};

use shared::AvailabilityMap;

use crate::error::AppResult;
use crate::services::AvailabilityService;
use crate::AppState;

/// Per-item availability across every bill, keyed by item name
pub async fn get_availability(State(state): State<AppState>) -> AppResult<Json<AvailabilityMap>> {
    let service = AvailabilityService::new(state.db.clone(), state.attachments.clone());
    let availability = service.availability().await?;
    Ok(Json(availability))
}
