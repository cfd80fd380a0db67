//! HTTP handlers for the stock movement log and audit

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use shared::StockMovement;

use crate::error::AppResult;
use crate::services::ledger::StockAudit;
use crate::services::LedgerService;
use crate::AppState;

const DEFAULT_MOVEMENT_LIMIT: i64 = 50;
const MAX_MOVEMENT_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    pub limit: Option<i64>,
}

/// The most recent stock movements, newest first
pub async fn list_stock_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
        .clamp(1, MAX_MOVEMENT_LIMIT);

    let service = LedgerService::new(state.db.clone());
    let movements = service.recent_movements(limit).await?;
    Ok(Json(movements))
}

/// Replay the movement log against the stored counters
pub async fn audit_stock(State(state): State<AppState>) -> AppResult<Json<StockAudit>> {
    let service = LedgerService::new(state.db.clone());
    let audit = service.audit().await?;
    Ok(Json(audit))
}
