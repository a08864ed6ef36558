//! Per-client booking session.
//!
//! A [`BookingSession`] subscribes to the reservation store and keeps the
//! most recent snapshot in a `tokio::sync::watch` channel. Checking a
//! candidate and committing it are two separate phases:
//!
//! 1. [`BookingSession::check`] runs the validator against the local
//!    snapshot when a slot is picked, before the form is sent
//! 2. [`BookingSession::submit`] re-validates against the freshest snapshot
//!    it can get and only then inserts
//!
//! With [`ConfirmSource::LocalSnapshot`] the freshest snapshot is the local
//! one at submit time. With [`ConfirmSource::StoreRead`] the capacity, quota
//! and duplicate checks are repeated once more against a fresh store read
//! right before the insert.
//!
//! This narrows the window in which two clients can both pass validation
//! against stale data. It does not close it: the store has no conditional
//! write, so a genuine race can still over-book a slot or a quota.

use crate::error::BookingError;
use crate::metrics::{BookingMetrics, StoreMetrics};
use crate::schedule::Schedule;
use crate::HealthCheck;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use slotbook_core::environment::Clock;
use slotbook_core::group::GroupId;
use slotbook_core::reservation::{Candidate, Reservation};
use slotbook_core::reservation_store::{ReservationStore, SnapshotStream, StoreError};
use slotbook_core::slot::SlotLabel;
use slotbook_core::snapshot::ReservationSnapshot;
use slotbook_core::validation::ValidationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Freshest data a submission is checked against before the write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmSource {
    /// The latest snapshot pushed by the subscription. No extra read.
    #[default]
    LocalSnapshot,
    /// A one-shot `list_once` issued right before the write, re-checked
    /// for capacity, quota and duplicates.
    StoreRead,
}

/// Session configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Source of the confirm snapshot
    pub confirm_source: ConfirmSource,
}

impl SessionConfig {
    /// Set the confirm snapshot source
    #[must_use]
    pub const fn with_confirm_source(mut self, confirm_source: ConfirmSource) -> Self {
        self.confirm_source = confirm_source;
        self
    }
}

/// One row of the quota view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Group identifier
    pub group_id: GroupId,
    /// Human-readable group name
    pub display_name: String,
    /// Seats allocated to the group
    pub quota: u32,
    /// Reservations the group holds
    pub used: u32,
    /// Seats left, never negative
    pub remaining: u32,
}

/// One row of the slot board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    /// Slot label
    pub label: SlotLabel,
    /// Concurrent-occupant limit
    pub capacity: u32,
    /// Reservations currently in the slot
    pub occupants: u32,
    /// Whether the slot accepts reservations at all
    pub bookable: bool,
    /// No place left
    pub full: bool,
}

/// A connected booking client.
///
/// Dropping the session stops the snapshot pump and unsubscribes.
pub struct BookingSession {
    store: Arc<dyn ReservationStore>,
    schedule: Arc<Schedule>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    snapshots: watch::Receiver<ReservationSnapshot>,
    feed_stale: Arc<AtomicBool>,
    in_flight: AtomicBool,
    pump: JoinHandle<()>,
}

impl BookingSession {
    /// Subscribes to `store` and waits for the first snapshot.
    ///
    /// Must be called from within a tokio runtime; the snapshot pump is
    /// spawned onto it.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if the subscription cannot be opened
    /// or ends before delivering the current state.
    pub async fn connect(
        store: Arc<dyn ReservationStore>,
        schedule: Arc<Schedule>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Result<Self, BookingError> {
        let mut feed = store
            .subscribe()
            .await
            .map_err(|error| store_failure("subscribe", error))?;

        let initial = match feed.next().await {
            Some(Ok(snapshot)) => snapshot,
            Some(Err(error)) => return Err(store_failure("subscribe", error)),
            None => {
                return Err(store_failure(
                    "subscribe",
                    StoreError::Subscription("feed closed before the first snapshot".to_string()),
                ));
            }
        };
        record_seats_remaining(&schedule, &initial);
        tracing::info!(reservations = initial.len(), "Booking session connected");

        let (sender, snapshots) = watch::channel(initial);
        let feed_stale = Arc::new(AtomicBool::new(false));
        let pump = tokio::spawn(pump_snapshots(
            feed,
            sender,
            Arc::clone(&schedule),
            Arc::clone(&feed_stale),
        ));

        Ok(Self {
            store,
            schedule,
            clock,
            config,
            snapshots,
            feed_stale,
            in_flight: AtomicBool::new(false),
            pump,
        })
    }

    /// The most recent snapshot this session has observed.
    #[must_use]
    pub fn snapshot(&self) -> ReservationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified whenever a new snapshot arrives.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<ReservationSnapshot> {
        self.snapshots.clone()
    }

    /// The schedule this session books against.
    #[must_use]
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Whether a submission is currently pending.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Quota, usage and remaining seats per group, in roster order.
    #[must_use]
    pub fn quota_usage(&self) -> Vec<QuotaUsage> {
        let snapshot = self.snapshot();
        let usage = snapshot.usage_by_group();
        self.schedule
            .quotas()
            .entries()
            .iter()
            .map(|entry| {
                let used = usage.get(&entry.group_id).copied().unwrap_or(0);
                QuotaUsage {
                    group_id: entry.group_id.clone(),
                    display_name: entry.display_name.clone(),
                    quota: entry.quota,
                    used,
                    remaining: entry.quota.saturating_sub(used),
                }
            })
            .collect()
    }

    /// Occupancy of every slot, in schedule order.
    #[must_use]
    pub fn slot_board(&self) -> Vec<SlotStatus> {
        let snapshot = self.snapshot();
        self.schedule
            .registry()
            .iter()
            .map(|slot| {
                let occupants = snapshot.occupancy(&slot.label);
                SlotStatus {
                    label: slot.label.clone(),
                    capacity: slot.capacity,
                    occupants,
                    bookable: slot.bookable,
                    full: occupants >= slot.capacity,
                }
            })
            .collect()
    }

    /// Validates `candidate` against the local snapshot without writing.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn check(&self, candidate: &Candidate) -> Result<(), ValidationError> {
        let result = self.schedule.validator().validate(candidate, &self.snapshot());
        if let Err(error) = &result {
            tracing::debug!(slot = %candidate.slot, reason = error.reason.code(), "Pre-check failed");
        }
        result
    }

    /// Validates and writes `candidate`.
    ///
    /// Validation runs against one local snapshot taken at submit time. When
    /// the session confirms against the store, capacity, quota and
    /// duplicates are re-checked on a fresh `list_once` before the insert.
    /// Only one submission per session may be pending; the write is never
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SubmissionInFlight`]: another submission is pending
    /// - [`BookingError::Validation`]: rejected by validation or confirm
    /// - [`BookingError::Store`]: the confirm read or the insert failed
    #[tracing::instrument(skip(self, candidate), fields(slot = %candidate.slot))]
    pub async fn submit(&self, candidate: Candidate) -> Result<Reservation, BookingError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Submission refused, another one is pending");
            return Err(BookingError::SubmissionInFlight);
        };
        BookingMetrics::record_submission();

        let validator = self.schedule.validator();
        let record = validator
            .accept(&candidate, &self.snapshot(), self.clock.now())
            .map_err(rejected)?;

        let started = Instant::now();
        if self.config.confirm_source == ConfirmSource::StoreRead {
            let fresh = ReservationSnapshot::new(
                self.store
                    .list_once()
                    .await
                    .map_err(|error| store_failure("list", error))?,
            );
            validator.confirm(&candidate, &fresh).map_err(rejected)?;
        }

        let id = self
            .store
            .insert(record.clone())
            .await
            .map_err(|error| store_failure("insert", error))?;

        BookingMetrics::record_accepted(started.elapsed());
        tracing::info!(
            reservation_id = %id,
            group = %record.group_id,
            "Reservation accepted"
        );
        Ok(record.into_reservation(id))
    }

    /// Reports whether the snapshot feed is live.
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        let check = if self.pump.is_finished() {
            HealthCheck::unhealthy("booking_session", "Snapshot feed closed")
        } else if self.feed_stale.load(Ordering::Acquire) {
            HealthCheck::degraded("booking_session", "Last snapshot feed item was an error")
        } else {
            HealthCheck::healthy("booking_session")
        };
        check.with_metadata("reservations", self.snapshots.borrow().len().to_string())
    }
}

impl Drop for BookingSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

impl std::fmt::Debug for BookingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingSession")
            .field("config", &self.config)
            .field("reservations", &self.snapshots.borrow().len())
            .field("in_flight", &self.is_submitting())
            .finish_non_exhaustive()
    }
}

/// Marks a submission as pending for as long as it lives.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn pump_snapshots(
    mut feed: SnapshotStream,
    sender: watch::Sender<ReservationSnapshot>,
    schedule: Arc<Schedule>,
    feed_stale: Arc<AtomicBool>,
) {
    while let Some(item) = feed.next().await {
        match item {
            Ok(snapshot) => {
                feed_stale.store(false, Ordering::Release);
                record_seats_remaining(&schedule, &snapshot);
                tracing::trace!(reservations = snapshot.len(), "Snapshot received");
                if sender.send(snapshot).is_err() {
                    break;
                }
            }
            Err(error) => {
                // Keep serving the last good snapshot.
                feed_stale.store(true, Ordering::Release);
                StoreMetrics::record_error("subscribe");
                tracing::warn!(%error, "Snapshot feed error");
            }
        }
    }
    tracing::debug!("Snapshot feed ended");
}

fn record_seats_remaining(schedule: &Schedule, snapshot: &ReservationSnapshot) {
    let booked = u32::try_from(snapshot.len()).unwrap_or(u32::MAX);
    BookingMetrics::record_seats_remaining(
        schedule.registry().total_bookable_capacity().saturating_sub(booked),
    );
}

fn rejected(error: ValidationError) -> BookingError {
    BookingMetrics::record_rejection(error.reason.code());
    tracing::info!(reason = error.reason.code(), "{}", error.reason);
    BookingError::Validation(error)
}

fn store_failure(op: &'static str, error: StoreError) -> BookingError {
    StoreMetrics::record_error(op);
    tracing::error!(op, %error, "Reservation store operation failed");
    BookingError::Store(error)
}
