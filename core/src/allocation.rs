//! Proportional seat quotas (largest-remainder apportionment).
//!
//! Every group is first guaranteed one seat. The remaining capacity is split
//! in proportion to population: each group takes the integer part of its
//! ideal share, and the seats lost to rounding go one each to the groups with
//! the largest fractional parts. Ties go to the group declared first.
//!
//! ```text
//! remaining = capacity - groups
//! share_i   = remaining * population_i / total_population
//! quota_i   = 1 + floor(share_i) + (1 if i is among the top `leftover` remainders)
//! ```
//!
//! All arithmetic is integer arithmetic. Remainders are compared by their
//! numerators `(remaining * population_i) mod total_population`, which share
//! a denominator, so ties are detected exactly and the result never depends
//! on floating-point rounding.
//!
//! # Example
//!
//! ```
//! use slotbook_core::allocation::allocate;
//! use slotbook_core::group::{Group, GroupId, Roster};
//!
//! let roster = Roster::new(vec![
//!     Group::new("a", "A", 10),
//!     Group::new("b", "B", 5),
//!     Group::new("c", "C", 5),
//! ])?;
//!
//! let quotas = allocate(&roster, 10)?;
//! assert_eq!(quotas.quota_of(&GroupId::new("a")), Some(4));
//! assert_eq!(quotas.quota_of(&GroupId::new("b")), Some(3));
//! assert_eq!(quotas.quota_of(&GroupId::new("c")), Some(3));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::group::{GroupId, Roster};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that make a quota allocation undefined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// The roster has no groups.
    #[error("Cannot allocate quotas for an empty roster")]
    EmptyRoster,

    /// Capacity cannot cover the one-seat floor of every group.
    #[error("Capacity {capacity} cannot give each of {groups} groups a seat")]
    InsufficientCapacity {
        /// Total seats available
        capacity: u32,
        /// Number of groups that each need a floor seat
        groups: usize,
    },

    /// Seats are left after the floor but nobody has any population to
    /// apportion them by.
    #[error("Total population is zero; {remaining} seats cannot be apportioned")]
    EmptyPopulation {
        /// Seats left after the floor
        remaining: u32,
    },
}

/// One group's line in the quota table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    /// Group identifier
    pub group_id: GroupId,
    /// Group display name
    pub display_name: String,
    /// Group head count
    pub population: u32,
    /// Seats this group may hold at once
    pub quota: u32,
}

/// Result of [`allocate`]: one entry per group, in roster order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTable {
    entries: Vec<QuotaEntry>,
    total_capacity: u32,
    total_population: u64,
}

impl QuotaTable {
    /// Entries in roster order.
    #[must_use]
    pub fn entries(&self) -> &[QuotaEntry] {
        &self.entries
    }

    /// Quota of a group, or `None` if the group is not in the table.
    #[must_use]
    pub fn quota_of(&self, group_id: &GroupId) -> Option<u32> {
        self.get(group_id).map(|entry| entry.quota)
    }

    /// Entry of a group.
    #[must_use]
    pub fn get(&self, group_id: &GroupId) -> Option<&QuotaEntry> {
        self.entries.iter().find(|entry| &entry.group_id == group_id)
    }

    /// Entries ordered by quota, largest first. Equal quotas keep roster order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&QuotaEntry> {
        let mut ranked: Vec<&QuotaEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.quota.cmp(&a.quota));
        ranked
    }

    /// Capacity the table was computed for.
    #[must_use]
    pub const fn total_capacity(&self) -> u32 {
        self.total_capacity
    }

    /// Sum of populations over all groups.
    #[must_use]
    pub const fn total_population(&self) -> u64 {
        self.total_population
    }

    /// Sum of all quotas. Equals [`Self::total_capacity`].
    #[must_use]
    pub fn total_quota(&self) -> u64 {
        self.entries.iter().map(|entry| u64::from(entry.quota)).sum()
    }
}

/// Computes each group's seat quota for `total_capacity` seats.
///
/// Deterministic: the same roster and capacity always produce the same table.
/// The quotas always sum to exactly `total_capacity`.
///
/// # Errors
///
/// - [`AllocationError::EmptyRoster`] if there are no groups
/// - [`AllocationError::InsufficientCapacity`] if `total_capacity` is smaller
///   than the number of groups
/// - [`AllocationError::EmptyPopulation`] if seats remain after the floor but
///   every population is zero
pub fn allocate(roster: &Roster, total_capacity: u32) -> Result<QuotaTable, AllocationError> {
    let groups = roster.groups();
    if groups.is_empty() {
        return Err(AllocationError::EmptyRoster);
    }

    let floor_seats = u32::try_from(groups.len()).unwrap_or(u32::MAX);
    let Some(remaining) = total_capacity.checked_sub(floor_seats) else {
        return Err(AllocationError::InsufficientCapacity {
            capacity: total_capacity,
            groups: groups.len(),
        });
    };

    let total_population = roster.total_population();
    if total_population == 0 && remaining > 0 {
        return Err(AllocationError::EmptyPopulation { remaining });
    }

    // (extra seats, remainder numerator) per group; both exact.
    let shares: Vec<(u64, u64)> = groups
        .iter()
        .map(|group| {
            if total_population == 0 {
                return (0, 0);
            }
            let numerator = u64::from(remaining) * u64::from(group.population);
            (numerator / total_population, numerator % total_population)
        })
        .collect();

    let distributed: u64 = shares.iter().map(|(extra, _)| extra).sum();
    // Fewer than `groups.len()` since every remainder is below one seat.
    let leftover = u64::from(remaining) - distributed;

    let mut by_remainder: Vec<usize> = (0..groups.len()).collect();
    // Stable: equal remainders keep roster order.
    by_remainder.sort_by(|&a, &b| shares[b].1.cmp(&shares[a].1));

    let mut quotas: Vec<u64> = shares.iter().map(|(extra, _)| 1 + extra).collect();
    for &index in by_remainder.iter().take(usize::try_from(leftover).unwrap_or(usize::MAX)) {
        quotas[index] += 1;
    }

    let entries = groups
        .iter()
        .zip(quotas)
        .map(|(group, quota)| QuotaEntry {
            group_id: group.id.clone(),
            display_name: group.display_name.clone(),
            population: group.population,
            // Bounded by total_capacity, which is a u32.
            quota: u32::try_from(quota).unwrap_or(u32::MAX),
        })
        .collect();

    Ok(QuotaTable {
        entries,
        total_capacity,
        total_population,
    })
}
