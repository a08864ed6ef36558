//! Bookable time windows.
//!
//! The [`SlotRegistry`] is the static schedule: an ordered list of
//! [`TimeSlot`]s with unique labels. Each slot has a concurrent-occupant
//! capacity (how many people can be served in that window at once, regardless
//! of group) and a `bookable` flag. Unbookable slots stay in the schedule so
//! the UI can show the gap, but they never accept a reservation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Concurrent occupants per slot when none is configured.
pub const DEFAULT_SLOT_CAPACITY: u32 = 2;

/// Label identifying a slot, e.g. `"10:00 - 10:30"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotLabel(String);

impl SlotLabel {
    /// Create a new `SlotLabel`.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Get the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SlotLabel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SlotLabel {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A time window in the schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Unique label
    pub label: SlotLabel,
    /// Length of the window in minutes
    pub duration_minutes: u32,
    /// Concurrent-occupant limit
    pub capacity: u32,
    /// Whether reservations may target this slot
    pub bookable: bool,
}

impl TimeSlot {
    /// A bookable slot with [`DEFAULT_SLOT_CAPACITY`].
    #[must_use]
    pub fn bookable(label: impl Into<SlotLabel>, duration_minutes: u32) -> Self {
        Self {
            label: label.into(),
            duration_minutes,
            capacity: DEFAULT_SLOT_CAPACITY,
            bookable: true,
        }
    }

    /// A slot that is shown but never accepts reservations.
    #[must_use]
    pub fn blocked(label: impl Into<SlotLabel>, duration_minutes: u32) -> Self {
        Self {
            bookable: false,
            ..Self::bookable(label, duration_minutes)
        }
    }

    /// Overrides the concurrent-occupant limit.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }
}

/// Errors raised while building a [`SlotRegistry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same label appears twice.
    #[error("Duplicate slot label: {0}")]
    DuplicateLabel(SlotLabel),

    /// A slot was declared with an empty label.
    #[error("Slot at position {0} has an empty label")]
    EmptyLabel(usize),
}

/// The static schedule of time slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotRegistry {
    slots: Vec<TimeSlot>,
}

impl SlotRegistry {
    /// Builds a registry from slots in display order.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::EmptyLabel`] if a label is the empty string
    /// - [`RegistryError::DuplicateLabel`] if two slots share a label
    pub fn new(slots: Vec<TimeSlot>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::with_capacity(slots.len());
        for (position, slot) in slots.iter().enumerate() {
            if slot.label.as_str().is_empty() {
                return Err(RegistryError::EmptyLabel(position));
            }
            if !seen.insert(&slot.label) {
                return Err(RegistryError::DuplicateLabel(slot.label.clone()));
            }
        }
        Ok(Self { slots })
    }

    /// The one-day schedule: a morning block, a short blocked buffer before
    /// lunch, and three afternoon blocks with one locked window.
    ///
    /// Every slot gets `capacity` concurrent occupants.
    #[must_use]
    pub fn default_schedule(capacity: u32) -> Self {
        let slots = [
            TimeSlot::bookable("10:00 - 10:30", 30),
            TimeSlot::bookable("10:30 - 11:00", 30),
            TimeSlot::bookable("11:00 - 11:30", 30),
            TimeSlot::blocked("11:30 - 11:50", 20),
            TimeSlot::bookable("13:00 - 13:30", 30),
            TimeSlot::bookable("13:30 - 14:00", 30),
            TimeSlot::blocked("14:00 - 14:30", 30),
            TimeSlot::bookable("14:40 - 15:10", 30),
            TimeSlot::bookable("15:10 - 15:40", 30),
            TimeSlot::bookable("15:40 - 16:10", 30),
            TimeSlot::bookable("16:10 - 16:40", 30),
            TimeSlot::bookable("16:50 - 17:20", 30),
            TimeSlot::bookable("17:20 - 17:50", 30),
        ];
        Self {
            slots: slots
                .into_iter()
                .map(|slot| slot.with_capacity(capacity))
                .collect(),
        }
    }

    /// All slots in display order, bookable or not.
    pub fn iter(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter()
    }

    /// Slots that accept reservations, in display order.
    pub fn list_bookable_slots(&self) -> impl Iterator<Item = &TimeSlot> {
        self.slots.iter().filter(|slot| slot.bookable)
    }

    /// Looks up a slot by label.
    #[must_use]
    pub fn get(&self, label: &SlotLabel) -> Option<&TimeSlot> {
        self.slots.iter().find(|slot| &slot.label == label)
    }

    /// Concurrent-occupant limit of a slot, or `None` for an unknown label.
    #[must_use]
    pub fn capacity_of(&self, label: &SlotLabel) -> Option<u32> {
        self.get(label).map(|slot| slot.capacity)
    }

    /// Sum of the capacities of all bookable slots: the seat count the
    /// quota allocator divides between groups.
    #[must_use]
    pub fn total_bookable_capacity(&self) -> u32 {
        self.list_bookable_slots().map(|slot| slot.capacity).sum()
    }

    /// Position of a slot in display order.
    #[must_use]
    pub fn position(&self, label: &SlotLabel) -> Option<usize> {
        self.slots.iter().position(|slot| &slot.label == label)
    }
}
