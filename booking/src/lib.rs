//! # Slotbook
//!
//! Proportional-quota appointment booking for a one-day schedule shared by
//! hospital departments.
//!
//! This crate wires the pieces together:
//! - [`config`]: environment configuration
//! - [`roster`]: the built-in department roster, or one loaded from JSON
//! - [`App`]: schedule, quotas, store and admin console built from a [`Config`]

use slotbook_core::environment::Clock;
use slotbook_core::reservation_store::ReservationStore;
use slotbook_core::slot::SlotRegistry;
use slotbook_runtime::metrics::MetricsError;
use slotbook_runtime::{AdminConsole, BookingError, BookingSession, Schedule, SessionConfig};
use std::sync::Arc;
use thiserror::Error;

pub mod config;
pub mod roster;

pub use config::{Config, ConfigError};

/// Errors raised while starting the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration or roster loading failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Quota allocation or the store failed
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The metrics recorder could not be installed
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// A configured booking application over one reservation store.
pub struct App {
    schedule: Arc<Schedule>,
    store: Arc<dyn ReservationStore>,
    session_config: SessionConfig,
}

impl App {
    /// Loads the roster, builds the schedule and allocates quotas.
    ///
    /// # Errors
    ///
    /// - [`AppError::Config`] if the roster cannot be loaded
    /// - [`AppError::Booking`] if the roster cannot be apportioned over the
    ///   schedule
    pub fn build(config: &Config, store: Arc<dyn ReservationStore>) -> Result<Self, AppError> {
        let roster = roster::load_roster(config.booking.roster_path.as_deref())?;
        let registry = SlotRegistry::default_schedule(config.booking.slot_capacity);
        let schedule = Schedule::new(registry, &roster)?;

        tracing::info!(
            groups = roster.len(),
            population = roster.total_population(),
            seats = schedule.quotas().total_capacity(),
            "Schedule ready"
        );

        Ok(Self {
            schedule: Arc::new(schedule),
            store,
            session_config: SessionConfig::default()
                .with_confirm_source(config.booking.confirm_source),
        })
    }

    /// The schedule and its quotas.
    #[must_use]
    pub fn schedule(&self) -> &Arc<Schedule> {
        &self.schedule
    }

    /// Connects a new booking client.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] if the store subscription fails.
    pub async fn session(&self, clock: Arc<dyn Clock>) -> Result<BookingSession, BookingError> {
        BookingSession::connect(
            Arc::clone(&self.store),
            Arc::clone(&self.schedule),
            clock,
            self.session_config,
        )
        .await
    }

    /// An admin console over the same store.
    #[must_use]
    pub fn admin(&self) -> AdminConsole {
        AdminConsole::new(Arc::clone(&self.store), Arc::clone(&self.schedule))
    }

    /// Logs the quota table, largest quota first.
    pub fn log_quotas(&self) {
        for entry in self.schedule.quotas().ranked() {
            tracing::info!(
                group = %entry.group_id,
                name = %entry.display_name,
                population = entry.population,
                quota = entry.quota,
                "Quota"
            );
        }
    }
}
