//! Route definitions for the Lab Inventory Management Platform

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Router,
};

use crate::external::attachments::MAX_PDF_BYTES;
use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Procurement bills
        .nest("/bills", bill_routes())
        // Device allocations
        .nest("/allocations", allocation_routes())
        // Stock availability for the allocation form
        .route("/availability", get(handlers::get_availability))
        // Catalog registries
        .nest("/devices", device_routes())
        .nest("/recurring-items", recurring_item_routes())
        .route("/devices-and-items", get(handlers::get_devices_and_items))
        // Dashboard reports
        .nest("/dashboard", dashboard_routes())
        // Stock movement log and audit
        .nest("/stock", stock_routes())
}

/// Procurement bill routes
fn bill_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_bills).post(handlers::create_bill))
        .route(
            "/:bill_id",
            get(handlers::get_bill)
                .put(handlers::update_bill)
                .delete(handlers::delete_bill),
        )
        // Multipart PDF upload needs headroom above the stored file cap
        .route(
            "/:bill_id/pdf",
            patch(handlers::attach_bill_pdf)
                .layer(DefaultBodyLimit::max(MAX_PDF_BYTES + 1024 * 1024)),
        )
}

/// Device allocation routes
fn allocation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_allocations).post(handlers::create_allocation),
        )
        .route(
            "/:allocation_id",
            get(handlers::get_allocation)
                .put(handlers::update_allocation)
                .delete(handlers::delete_allocation),
        )
}

/// Device registry routes
fn device_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::list_devices).post(handlers::create_device))
}

/// Recurring item registry routes
fn recurring_item_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_recurring_items).post(handlers::create_recurring_item),
    )
}

/// Dashboard report routes
fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(handlers::get_device_summary))
        .route("/expenses/yearly", get(handlers::get_yearly_expenses))
        .route("/labs/summary", get(handlers::get_lab_summary))
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/warranties/expiring", get(handlers::get_expiring_warranties))
}

/// Stock movement log routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/movements", get(handlers::list_stock_movements))
        .route("/audit", get(handlers::audit_stock))
}
