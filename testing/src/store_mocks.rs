//! In-memory reservation store for tests.
//!
//! [`InMemoryReservationStore`] keeps records in a `Vec` behind a mutex and
//! pushes a full snapshot to every subscriber after each mutation through a
//! `tokio::sync::watch` channel. Like a real live feed, a slow subscriber may
//! skip intermediate snapshots but always ends on the latest one.
//!
//! The feed itself can be made to deliver an error item or to end, and
//! failures can be injected per operation to exercise error paths:
//!
//! ```
//! use slotbook_core::reservation_store::{ReservationStore, StoreError};
//! use slotbook_testing::InMemoryReservationStore;
//!
//! # async fn example() {
//! let store = InMemoryReservationStore::new();
//! store.fail_next_insert(StoreError::PermissionDenied("rules".to_string()));
//! # }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

use slotbook_core::reservation::{NewReservation, Reservation, ReservationId};
use slotbook_core::reservation_store::{ReservationStore, SnapshotStream, StoreError};
use slotbook_core::snapshot::ReservationSnapshot;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Latest item of the live feed. `None` once the feed has been closed.
type FeedItem = Option<Result<ReservationSnapshot, StoreError>>;

#[derive(Debug, Default)]
struct Faults {
    next_insert: Option<StoreError>,
    next_list: Option<StoreError>,
    next_subscribe: Option<StoreError>,
    deletes: HashMap<ReservationId, StoreError>,
}

/// In-memory reservation store for fast, deterministic tests.
///
/// Cloning shares the underlying records, so several sessions can be pointed
/// at one store to simulate concurrent clients.
#[derive(Clone, Debug)]
pub struct InMemoryReservationStore {
    records: Arc<Mutex<Vec<Reservation>>>,
    feed: Arc<watch::Sender<FeedItem>>,
    faults: Arc<Mutex<Faults>>,
    insert_latency: Option<Duration>,
}

impl InMemoryReservationStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Some(Ok(ReservationSnapshot::empty())));
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            feed: Arc::new(feed),
            faults: Arc::new(Mutex::new(Faults::default())),
            insert_latency: None,
        }
    }

    /// Create a store that already holds `reservations`.
    #[must_use]
    pub fn with_reservations(reservations: Vec<Reservation>) -> Self {
        let store = Self::new();
        *store.records.lock().unwrap() = reservations;
        store.publish();
        store
    }

    /// Delay every insert by `latency` before it is applied.
    ///
    /// Useful for holding a submission in flight.
    #[must_use]
    pub const fn with_insert_latency(mut self, latency: Duration) -> Self {
        self.insert_latency = Some(latency);
        self
    }

    /// Make the next `insert` fail with `error` without writing.
    pub fn fail_next_insert(&self, error: StoreError) {
        self.faults.lock().unwrap().next_insert = Some(error);
    }

    /// Make the next `list_once` fail with `error`.
    pub fn fail_next_list(&self, error: StoreError) {
        self.faults.lock().unwrap().next_list = Some(error);
    }

    /// Make the next `subscribe` fail with `error`.
    pub fn fail_next_subscribe(&self, error: StoreError) {
        self.faults.lock().unwrap().next_subscribe = Some(error);
    }

    /// Make every delete of `id` fail with `error` and leave the record.
    pub fn fail_delete_of(&self, id: ReservationId, error: StoreError) {
        self.faults.lock().unwrap().deletes.insert(id, error);
    }

    /// Push `error` to every subscriber as the latest feed item.
    ///
    /// The next mutation pushes a good snapshot again.
    pub fn fail_feed(&self, error: StoreError) {
        self.feed.send_replace(Some(Err(error)));
    }

    /// End every open subscription, as a dropped connection would.
    pub fn close_feed(&self) {
        self.feed.send_replace(None);
    }

    /// Write a record directly, bypassing validation, as another client
    /// would. Returns the assigned id.
    pub fn insert_unchecked(&self, reservation: NewReservation) -> ReservationId {
        let id = ReservationId::new(uuid::Uuid::new_v4().to_string());
        self.records
            .lock()
            .unwrap()
            .push(reservation.into_reservation(id.clone()));
        self.publish();
        id
    }

    /// Current records, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<Reservation> {
        self.records.lock().unwrap().clone()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }

    fn publish(&self) {
        let snapshot = ReservationSnapshot::new(self.records.lock().unwrap().clone());
        self.feed.send_replace(Some(Ok(snapshot)));
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<SnapshotStream, StoreError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(error) = self.faults.lock().unwrap().next_subscribe.take() {
                return Err(error);
            }

            let mut receiver = self.feed.subscribe();
            let stream: SnapshotStream = Box::pin(async_stream::stream! {
                loop {
                    let Some(item) = receiver.borrow_and_update().clone() else {
                        break;
                    };
                    yield item;
                    if receiver.changed().await.is_err() {
                        break;
                    }
                }
            });
            Ok(stream)
        })
    }

    fn insert(
        &self,
        reservation: NewReservation,
    ) -> Pin<Box<dyn Future<Output = Result<ReservationId, StoreError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(latency) = self.insert_latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(error) = self.faults.lock().unwrap().next_insert.take() {
                return Err(error);
            }
            Ok(self.insert_unchecked(reservation))
        })
    }

    fn delete_by_id(
        &self,
        id: &ReservationId,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move {
            if let Some(error) = self.faults.lock().unwrap().deletes.get(&id) {
                return Err(error.clone());
            }

            let removed = {
                let mut records = self.records.lock().unwrap();
                let before = records.len();
                records.retain(|record| record.id != id);
                records.len() != before
            };
            if !removed {
                return Err(StoreError::NotFound(id));
            }
            self.publish();
            Ok(())
        })
    }

    fn list_once(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            if let Some(error) = self.faults.lock().unwrap().next_list.take() {
                return Err(error);
            }
            Ok(self.records())
        })
    }
}
