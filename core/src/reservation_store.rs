//! Reservation store trait and related types.
//!
//! The store is the only shared mutable resource: a durable collection of
//! reservation records that many clients read and write concurrently. The
//! booking core needs very little from it:
//!
//! - a live feed of the full reservation set, pushed on every change
//! - atomic single-record insert, returning the assigned id
//! - atomic single-record delete
//! - a one-shot read of every record
//!
//! There is no bulk update and no conditional write. Every derived count is
//! recomputed from the full set, and nothing here prevents two clients from
//! inserting against the same stale state (see [`crate::validation`]).
//!
//! # Implementations
//!
//! - `InMemoryReservationStore` (in `slotbook-testing`): fast, deterministic
//!   tests with fault injection
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use slotbook_core::reservation_store::{ReservationStore, StoreError};
//!
//! async fn watch<S: ReservationStore>(store: &S) -> Result<(), StoreError> {
//!     let mut snapshots = store.subscribe().await?;
//!     while let Some(snapshot) = snapshots.next().await {
//!         let snapshot = snapshot?;
//!         println!("{} reservations", snapshot.len());
//!     }
//!     Ok(())
//! }
//! ```

use crate::reservation::{NewReservation, Reservation, ReservationId};
use crate::snapshot::ReservationSnapshot;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors reported by a reservation store.
///
/// None of these is retried by the core; the caller decides.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The insert was not persisted (network failure, quota, ...).
    #[error("Write failed: {0}")]
    Write(String),

    /// The store refused the operation for this client.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No record with this id exists.
    #[error("Reservation not found: {0}")]
    NotFound(ReservationId),

    /// The delete was not applied.
    #[error("Delete of {id} failed: {reason}")]
    Delete {
        /// Record that should have been deleted
        id: ReservationId,
        /// Why it was not
        reason: String,
    },

    /// A one-shot read failed.
    #[error("Read failed: {0}")]
    Read(String),

    /// The live feed could not be opened or broke.
    #[error("Subscription failed: {0}")]
    Subscription(String),
}

/// Live feed of full reservation snapshots.
///
/// The first item is the current state. Dropping the stream unsubscribes.
pub type SnapshotStream =
    Pin<Box<dyn Stream<Item = Result<ReservationSnapshot, StoreError>> + Send>>;

/// Shared, concurrently written collection of reservations.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so that
/// the store can be shared as `Arc<dyn ReservationStore>`.
pub trait ReservationStore: Send + Sync {
    /// Opens a live feed of the full reservation set.
    ///
    /// # Errors
    ///
    /// - `Subscription`: the feed could not be opened
    /// - `PermissionDenied`: the client may not read reservations
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<SnapshotStream, StoreError>> + Send + '_>>;

    /// Persists one record and returns the id the store assigned.
    ///
    /// # Errors
    ///
    /// - `Write`: the record was not persisted
    /// - `PermissionDenied`: the client may not write reservations
    fn insert(
        &self,
        reservation: NewReservation,
    ) -> Pin<Box<dyn Future<Output = Result<ReservationId, StoreError>> + Send + '_>>;

    /// Deletes one record.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no record has this id
    /// - `Delete`: the record exists but was not deleted
    fn delete_by_id(
        &self,
        id: &ReservationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Reads every record once.
    ///
    /// # Errors
    ///
    /// - `Read`: the read failed
    fn list_once(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, StoreError>> + Send + '_>>;
}
