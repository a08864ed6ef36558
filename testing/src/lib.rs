//! # Slotbook Testing
//!
//! Testing utilities and helpers for slotbook.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - An in-memory reservation store with fault injection
//! - Fixtures for groups, slots, candidates and reservations
//! - Property-based testing strategies
//! - A Given-When-Then harness for the validator
//!
//! ## Example
//!
//! ```
//! use slotbook_testing::{fixtures, ValidatorTest};
//!
//! let (registry, quotas) = fixtures::three_group_schedule();
//! ValidatorTest::new(&registry, &quotas)
//!     .given_reservations(vec![
//!         fixtures::reservation(1, "a", fixtures::MORNING),
//!         fixtures::reservation(2, "b", fixtures::MORNING),
//!     ])
//!     .when_candidate(fixtures::candidate(3, "c", fixtures::MORNING))
//!     .then_rejected_with("slot_full")
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use slotbook_core::environment::Clock;

mod store_mocks;

/// Mock implementations of Environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use slotbook_testing::mocks::FixedClock;
    /// use slotbook_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Ready-made groups, schedules, candidates and reservations.
///
/// Every helper numbered `n` produces the identity `Holder n`,
/// `holder{n}@example.com`, contact suffix `n` zero-padded to four digits,
/// so distinct numbers never collide on any identity field.
pub mod fixtures {
    #![allow(clippy::expect_used)] // Fixtures are hardcoded and known-valid

    use super::mocks::test_clock;
    use super::Clock;
    use chrono::Duration;
    use slotbook_core::allocation::{allocate, QuotaTable};
    use slotbook_core::group::{Group, GroupId, Roster};
    use slotbook_core::reservation::{Candidate, NewReservation, Reservation, ReservationId};
    use slotbook_core::slot::{SlotRegistry, TimeSlot};

    /// First bookable slot of [`small_registry`].
    pub const MORNING: &str = "09:00 - 09:30";
    /// Second bookable slot of [`small_registry`].
    pub const LATE_MORNING: &str = "09:30 - 10:00";
    /// Unbookable break in [`small_registry`].
    pub const BREAK: &str = "10:00 - 10:15";

    /// Groups A (10), B (5) and C (5), with ids `a`, `b`, `c`.
    #[must_use]
    pub fn three_group_roster() -> Roster {
        Roster::new(vec![
            Group::new("a", "Group A", 10),
            Group::new("b", "Group B", 5),
            Group::new("c", "Group C", 5),
        ])
        .expect("fixture roster is valid")
    }

    /// Five bookable two-place slots around one unbookable break: ten seats.
    #[must_use]
    pub fn small_registry() -> SlotRegistry {
        SlotRegistry::new(vec![
            TimeSlot::bookable(MORNING, 30),
            TimeSlot::bookable(LATE_MORNING, 30),
            TimeSlot::blocked(BREAK, 15),
            TimeSlot::bookable("10:15 - 10:45", 30),
            TimeSlot::bookable("10:45 - 11:15", 30),
            TimeSlot::bookable("11:15 - 11:45", 30),
        ])
        .expect("fixture schedule is valid")
    }

    /// [`small_registry`] and the quotas of [`three_group_roster`] over it
    /// (A=4, B=3, C=3).
    #[must_use]
    pub fn three_group_schedule() -> (SlotRegistry, QuotaTable) {
        let registry = small_registry();
        let quotas = allocate(&three_group_roster(), registry.total_bookable_capacity())
            .expect("ten seats cover three groups");
        (registry, quotas)
    }

    /// A complete, well-formed candidate with identity number `n`.
    #[must_use]
    pub fn candidate(n: u32, group: &str, slot: &str) -> Candidate {
        Candidate::new(
            format!("Holder {n}"),
            group,
            format!("holder{n}@example.com"),
            format!("{:04}", n % 10_000),
            slot,
        )
    }

    /// The record the accept path would build for [`candidate`] `n`,
    /// stamped `n` minutes after the test clock.
    #[must_use]
    pub fn new_reservation(n: u32, group: &str, slot: &str) -> NewReservation {
        let candidate = candidate(n, group, slot);
        NewReservation {
            holder_name: candidate.holder_name,
            group_id: GroupId::new(group),
            email: candidate.email,
            contact_suffix: candidate.contact_suffix,
            slot: candidate.slot,
            created_at: test_clock().now() + Duration::minutes(i64::from(n)),
        }
    }

    /// A stored reservation for identity `n`, with id `r{n}`.
    #[must_use]
    pub fn reservation(n: u32, group: &str, slot: &str) -> Reservation {
        new_reservation(n, group, slot).into_reservation(ReservationId::new(format!("r{n}")))
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use slotbook_core::group::{Group, Roster};

    /// Rosters of 1 to `max_groups` groups with unique ids `g0..` and
    /// populations up to `max_population`. At least one population is
    /// non-zero.
    pub fn arb_roster(max_groups: usize, max_population: u32) -> impl Strategy<Value = Roster> {
        prop::collection::vec(0..=max_population, 1..=max_groups.max(1))
            .prop_filter("some population must be non-zero", |pops| {
                pops.iter().any(|&p| p > 0)
            })
            .prop_filter_map("roster ids are unique", |pops| {
                Roster::new(
                    pops.into_iter()
                        .enumerate()
                        .map(|(i, population)| Group::new(format!("g{i}"), format!("Group {i}"), population))
                        .collect(),
                )
                .ok()
            })
    }

    /// A roster paired with a capacity that covers its floor seats.
    pub fn arb_roster_and_capacity(
        max_groups: usize,
        max_population: u32,
        max_extra_seats: u32,
    ) -> impl Strategy<Value = (Roster, u32)> {
        arb_roster(max_groups, max_population).prop_flat_map(move |roster| {
            let floor = u32::try_from(roster.len()).unwrap_or(u32::MAX);
            (Just(roster), floor..=floor.saturating_add(max_extra_seats))
        })
    }
}

/// Installs a compact tracing subscriber for test output.
///
/// Honors `RUST_LOG`; safe to call from every test, only the first call
/// installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slotbook=debug")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock};
pub use store_mocks::InMemoryReservationStore;
pub use validator_test::ValidatorTest;
