//! # Slotbook Core
//!
//! Domain types and pure decision logic for proportional-quota appointment
//! booking.
//!
//! A fixed number of seats (time slots × concurrent occupants) is shared by
//! several groups. Each group gets a quota proportional to its population,
//! and people book individual slots against a shared, concurrently written
//! reservation store.
//!
//! ## Core Concepts
//!
//! - **Roster**: the ordered groups and their populations ([`group`])
//! - **Quota Allocator**: largest-remainder apportionment of seats ([`allocation`])
//! - **Slot Registry**: the static schedule and per-slot capacity ([`slot`])
//! - **Snapshot**: the full reservation set, source of every derived count ([`snapshot`])
//! - **Validator**: accept/reject with a reason, plus the confirm re-check ([`validation`])
//! - **Reservation Store**: the external collaborator, behind a trait ([`reservation_store`])
//!
//! ## Architecture Principles
//!
//! - No process-wide state: registry, quotas and snapshot are passed in
//! - Pure decisions, I/O only through [`reservation_store::ReservationStore`]
//! - Dependency injection for time via [`environment::Clock`]
//!
//! ## Example
//!
//! ```
//! use slotbook_core::allocation::allocate;
//! use slotbook_core::group::{Group, Roster};
//! use slotbook_core::reservation::Candidate;
//! use slotbook_core::slot::SlotRegistry;
//! use slotbook_core::snapshot::ReservationSnapshot;
//! use slotbook_core::validation::ReservationValidator;
//!
//! let registry = SlotRegistry::default_schedule(2);
//! let roster = Roster::new(vec![
//!     Group::new("surgery", "Surgery", 8),
//!     Group::new("ent", "ENT", 4),
//! ])?;
//! let quotas = allocate(&roster, registry.total_bookable_capacity())?;
//!
//! let validator = ReservationValidator::new(&registry, &quotas);
//! let candidate = Candidate::new("Ada", "ent", "ada@example.com", "1234", "10:00 - 10:30");
//! assert!(validator.validate(&candidate, &ReservationSnapshot::empty()).is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Groups and the roster they are declared in
pub mod group;

/// Largest-remainder quota allocation
pub mod allocation;

/// Time slots and the static schedule
pub mod slot;

/// Reservation records and booking candidates
pub mod reservation;

/// Reservation snapshots and derived counts
pub mod snapshot;

/// Accept/reject decisions
pub mod validation;

/// The reservation store abstraction
pub mod reservation_store;

/// Environment module - Dependency injection traits
///
/// External dependencies the core touches are abstracted behind traits and
/// injected by the caller.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use slotbook_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use allocation::{allocate, AllocationError, QuotaEntry, QuotaTable};
pub use group::{Group, GroupId, Roster, RosterError};
pub use reservation::{Candidate, NewReservation, Reservation, ReservationId};
pub use reservation_store::{ReservationStore, SnapshotStream, StoreError};
pub use slot::{RegistryError, SlotLabel, SlotRegistry, TimeSlot};
pub use snapshot::{ReservationSnapshot, SnapshotSummary};
pub use validation::{IdentityField, RejectReason, ReservationValidator, ValidationError};
