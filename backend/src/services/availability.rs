//! Stock availability service

use sqlx::PgPool;

use shared::{project_availability, AvailabilityMap};

use crate::error::AppResult;
use crate::external::AttachmentStore;
use crate::services::BillService;

/// Availability service projecting per-item stock across bills
#[derive(Clone)]
pub struct AvailabilityService {
    db: PgPool,
    attachments: AttachmentStore,
}

impl AvailabilityService {
    /// Create a new AvailabilityService instance
    pub fn new(db: PgPool, attachments: AttachmentStore) -> Self {
        Self { db, attachments }
    }

    /// Per-item availability across every bill, keyed by item name.
    ///
    /// Fully allocated entries are included; the allocation form greys them
    /// out rather than hiding where earlier stock went.
    pub async fn availability(&self) -> AppResult<AvailabilityMap> {
        let bill_service = BillService::new(self.db.clone(), self.attachments.clone());
        let bills = bill_service.list_bills().await?;
        Ok(project_availability(&bills))
    }
}
