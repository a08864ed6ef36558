//! The full reservation set as last observed from the store.
//!
//! Every count the validator needs (slot occupancy, group usage, identity
//! collisions) is derived from the snapshot on demand. Nothing is cached
//! between snapshots, so a delete is reflected in every count as soon as the
//! next snapshot arrives.

use crate::allocation::QuotaTable;
use crate::group::GroupId;
use crate::reservation::{Candidate, Reservation};
use crate::slot::{SlotLabel, SlotRegistry};
use crate::validation::IdentityField;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable view of every reservation currently in the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSnapshot {
    reservations: Vec<Reservation>,
}

impl ReservationSnapshot {
    /// Wraps a full reservation set.
    #[must_use]
    pub const fn new(reservations: Vec<Reservation>) -> Self {
        Self { reservations }
    }

    /// A snapshot with no reservations.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            reservations: Vec::new(),
        }
    }

    /// All reservations, in store order.
    #[must_use]
    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Number of reservations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    /// `true` if nobody has booked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// Occupants currently holding `slot`.
    #[must_use]
    pub fn occupancy(&self, slot: &SlotLabel) -> u32 {
        count(self.in_slot(slot))
    }

    /// Reservations currently held by members of `group`.
    #[must_use]
    pub fn group_usage(&self, group: &GroupId) -> u32 {
        count(self.reservations.iter().filter(|r| &r.group_id == group))
    }

    /// Reservation count per group. Groups with no reservation are absent.
    #[must_use]
    pub fn usage_by_group(&self) -> HashMap<GroupId, u32> {
        let mut usage = HashMap::new();
        for reservation in &self.reservations {
            *usage.entry(reservation.group_id.clone()).or_insert(0) += 1;
        }
        usage
    }

    /// Reservations of one slot, in store order.
    pub fn in_slot<'a>(&'a self, slot: &'a SlotLabel) -> impl Iterator<Item = &'a Reservation> {
        self.reservations.iter().filter(move |r| &r.slot == slot)
    }

    /// First identity field of `candidate` already used by an existing
    /// reservation, checked in the order name, email, contact suffix.
    ///
    /// Each field is checked against every reservation independently, so a
    /// suffix collision is found even when name and email differ.
    #[must_use]
    pub fn find_duplicate(&self, candidate: &Candidate) -> Option<IdentityField> {
        if self
            .reservations
            .iter()
            .any(|r| r.holder_name == candidate.holder_name)
        {
            return Some(IdentityField::Name);
        }
        if self.reservations.iter().any(|r| r.email == candidate.email) {
            return Some(IdentityField::Email);
        }
        if self
            .reservations
            .iter()
            .any(|r| r.contact_suffix == candidate.contact_suffix)
        {
            return Some(IdentityField::ContactSuffix);
        }
        None
    }

    /// Reservations ordered by slot (registry order, unknown slots last) and
    /// then by creation time.
    #[must_use]
    pub fn ordered_by_slot(&self, registry: &SlotRegistry) -> Vec<&Reservation> {
        let mut ordered: Vec<&Reservation> = self.reservations.iter().collect();
        ordered.sort_by_key(|r| {
            (
                registry.position(&r.slot).unwrap_or(usize::MAX),
                r.created_at,
            )
        });
        ordered
    }
}

/// Dashboard figures derived from a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Reservations currently held
    pub total_booked: u32,
    /// Seats still free across all bookable slots (never negative)
    pub remaining: u32,
    /// Group holding the most reservations; ties go to roster order
    pub busiest_group: Option<GroupId>,
}

impl SnapshotSummary {
    /// Computes the summary for `snapshot`.
    #[must_use]
    pub fn compute(
        snapshot: &ReservationSnapshot,
        registry: &SlotRegistry,
        quotas: &QuotaTable,
    ) -> Self {
        let total_booked = count(snapshot.reservations.iter());
        let usage = snapshot.usage_by_group();

        let mut busiest: Option<(&GroupId, u32)> = None;
        for entry in quotas.entries() {
            let used = usage.get(&entry.group_id).copied().unwrap_or(0);
            if used > 0 && busiest.is_none_or(|(_, best)| used > best) {
                busiest = Some((&entry.group_id, used));
            }
        }

        Self {
            total_booked,
            remaining: registry.total_bookable_capacity().saturating_sub(total_booked),
            busiest_group: busiest.map(|(group, _)| group.clone()),
        }
    }
}

fn count<'a>(reservations: impl Iterator<Item = &'a Reservation>) -> u32 {
    u32::try_from(reservations.count()).unwrap_or(u32::MAX)
}
