//! # Slotbook Runtime
//!
//! The imperative shell around the pure booking core.
//!
//! This crate connects the validator to a live [`ReservationStore`]: it keeps
//! the latest snapshot pushed by the store, runs the confirm-then-commit
//! protocol for each submission, and offers the administrative operations.
//!
//! ## Core Components
//!
//! - **Schedule**: the slot registry plus the quota table allocated over it
//! - **`BookingSession`**: one per client; snapshot pump, pre-checks, submit
//! - **`AdminConsole`**: single delete, clear-all and dashboard figures
//! - **Metrics**: Prometheus counters for submissions, rejections and store errors
//!
//! ## Example
//!
//! ```ignore
//! use slotbook_runtime::{BookingSession, Schedule, SessionConfig};
//!
//! let schedule = Arc::new(Schedule::new(SlotRegistry::default_schedule(2), &roster)?);
//! let session = BookingSession::connect(store, schedule, clock, SessionConfig::default()).await?;
//!
//! match session.submit(candidate).await {
//!     Ok(reservation) => println!("booked {}", reservation.id),
//!     Err(error) => println!("{error}"),
//! }
//! ```
//!
//! [`ReservationStore`]: slotbook_core::reservation_store::ReservationStore

/// Prometheus metrics for observability
pub mod metrics;

/// Slot registry and quota table shared by sessions
pub mod schedule;

/// Per-client booking session
pub mod session;

/// Administrative operations
pub mod admin;

/// Error types for the booking runtime
pub mod error {
    use slotbook_core::allocation::AllocationError;
    use slotbook_core::reservation_store::StoreError;
    use slotbook_core::validation::{RejectReason, ValidationError};
    use thiserror::Error;

    /// Errors returned by booking operations.
    ///
    /// Only `Store` means the outcome of a write may be uncertain; every
    /// other variant is raised before anything is written.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum BookingError {
        /// The candidate was rejected. Nothing was written.
        #[error(transparent)]
        Validation(#[from] ValidationError),

        /// The reservation store failed. Not retried.
        #[error("Reservation store error: {0}")]
        Store(#[from] StoreError),

        /// Another submission from this session has not finished yet.
        #[error("A submission is already in progress")]
        SubmissionInFlight,

        /// Quotas could not be computed for the roster and schedule.
        #[error("Quota allocation failed: {0}")]
        Allocation(#[from] AllocationError),
    }

    impl BookingError {
        /// The rejection reason, if this is a validation failure.
        #[must_use]
        pub const fn reject_reason(&self) -> Option<&RejectReason> {
            match self {
                Self::Validation(error) => Some(&error.reason),
                _ => None,
            }
        }
    }
}

/// Health check status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component works but on stale data
    Degraded,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Check if status is unhealthy
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    pub message: Option<String>,

    /// Optional metadata (e.g. counts)
    pub metadata: Vec<(String, String)>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            metadata: Vec::new(),
        }
    }

    /// Create a degraded check result
    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Add metadata to the health check
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

pub use admin::{AdminConsole, AdminSummary, ClearReport};
pub use error::BookingError;
pub use schedule::Schedule;
pub use session::{BookingSession, ConfirmSource, QuotaUsage, SessionConfig, SlotStatus};
