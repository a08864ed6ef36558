//! Administrative operations over the reservation store.
//!
//! Deletions are single-record and independent. [`AdminConsole::clear_all`]
//! issues one delete per record concurrently and reports partial failure
//! instead of rolling back: records deleted before a failure stay deleted.

use crate::metrics::{AdminMetrics, StoreMetrics};
use crate::schedule::Schedule;
use futures::future::join_all;
use slotbook_core::reservation::{Reservation, ReservationId};
use slotbook_core::reservation_store::{ReservationStore, StoreError};
use slotbook_core::snapshot::{ReservationSnapshot, SnapshotSummary};
use std::sync::Arc;

/// Outcome of [`AdminConsole::clear_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Records that were deleted
    pub deleted: Vec<ReservationId>,
    /// Records that were not, with the store's error
    pub failed: Vec<(ReservationId, StoreError)>,
}

impl ClearReport {
    /// Every record was deleted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Dashboard data for the admin view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminSummary {
    /// Totals and busiest group
    pub figures: SnapshotSummary,
    /// Every booking, by slot then creation time
    pub bookings: Vec<Reservation>,
}

/// Administrative client.
#[derive(Clone)]
pub struct AdminConsole {
    store: Arc<dyn ReservationStore>,
    schedule: Arc<Schedule>,
}

impl AdminConsole {
    /// Create a console over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>, schedule: Arc<Schedule>) -> Self {
        Self { store, schedule }
    }

    /// Deletes one reservation.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged.
    pub async fn delete(&self, id: &ReservationId) -> Result<(), StoreError> {
        match self.store.delete_by_id(id).await {
            Ok(()) => {
                AdminMetrics::record_deleted();
                tracing::info!(reservation_id = %id, "Reservation deleted");
                Ok(())
            }
            Err(error) => {
                AdminMetrics::record_failed();
                StoreMetrics::record_error("delete");
                tracing::warn!(reservation_id = %id, %error, "Delete failed");
                Err(error)
            }
        }
    }

    /// Deletes every reservation, one independent delete per record.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the records cannot be listed. Failed
    /// deletes are reported in the [`ClearReport`], not as an error.
    pub async fn clear_all(&self) -> Result<ClearReport, StoreError> {
        let records = self.list().await?;
        tracing::info!(records = records.len(), "Clearing all reservations");

        let outcomes = join_all(records.iter().map(|record| async move {
            (record.id.clone(), self.delete(&record.id).await)
        }))
        .await;

        let mut report = ClearReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.deleted.push(id),
                Err(error) => report.failed.push((id, error)),
            }
        }

        if report.is_complete() {
            tracing::info!(deleted = report.deleted.len(), "All reservations cleared");
        } else {
            tracing::warn!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "Clear finished with failures"
            );
        }
        Ok(report)
    }

    /// Totals, remaining seats, busiest group and the ordered booking list.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the records cannot be listed.
    pub async fn summary(&self) -> Result<AdminSummary, StoreError> {
        let snapshot = ReservationSnapshot::new(self.list().await?);
        let figures =
            SnapshotSummary::compute(&snapshot, self.schedule.registry(), self.schedule.quotas());
        let bookings = snapshot
            .ordered_by_slot(self.schedule.registry())
            .into_iter()
            .cloned()
            .collect();
        Ok(AdminSummary { figures, bookings })
    }

    async fn list(&self) -> Result<Vec<Reservation>, StoreError> {
        self.store.list_once().await.map_err(|error| {
            StoreMetrics::record_error("list");
            tracing::error!(%error, "Listing reservations failed");
            error
        })
    }
}

impl std::fmt::Debug for AdminConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConsole").finish_non_exhaustive()
    }
}
