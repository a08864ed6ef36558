//! Reservation records and the candidate form they are built from.
//!
//! A [`Candidate`] is raw user input and may be incomplete. Once it passes
//! validation it becomes a [`NewReservation`], which the store persists and
//! returns as a [`Reservation`] carrying the store-assigned id. Reservations
//! are never mutated after creation; they are only deleted.

use crate::group::GroupId;
use crate::slot::SlotLabel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the reservation store on insert.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    /// Create a new `ReservationId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReservationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReservationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Booking form input.
///
/// Empty strings and `None` mean "not filled in". Values are compared
/// exactly as entered: no trimming, no case folding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Full name of the person booking
    pub holder_name: String,
    /// Group the person belongs to
    pub group_id: Option<GroupId>,
    /// Contact email
    pub email: String,
    /// Last four digits of the contact phone number
    pub contact_suffix: String,
    /// Requested slot
    pub slot: SlotLabel,
}

impl Candidate {
    /// Creates a fully filled-in candidate.
    #[must_use]
    pub fn new(
        holder_name: impl Into<String>,
        group_id: impl Into<GroupId>,
        email: impl Into<String>,
        contact_suffix: impl Into<String>,
        slot: impl Into<SlotLabel>,
    ) -> Self {
        Self {
            holder_name: holder_name.into(),
            group_id: Some(group_id.into()),
            email: email.into(),
            contact_suffix: contact_suffix.into(),
            slot: slot.into(),
        }
    }

    /// Same candidate, different slot.
    #[must_use]
    pub fn for_slot(mut self, slot: impl Into<SlotLabel>) -> Self {
        self.slot = slot.into();
        self
    }
}

/// A validated reservation ready to be written. Has no id yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    /// Full name of the holder
    pub holder_name: String,
    /// Holder's group
    pub group_id: GroupId,
    /// Contact email
    pub email: String,
    /// Last four digits of the contact phone number
    pub contact_suffix: String,
    /// Reserved slot
    pub slot: SlotLabel,
    /// When the accept path created the record
    pub created_at: DateTime<Utc>,
}

impl NewReservation {
    /// Attaches the id the store assigned.
    #[must_use]
    pub fn into_reservation(self, id: ReservationId) -> Reservation {
        Reservation {
            id,
            holder_name: self.holder_name,
            group_id: self.group_id,
            email: self.email,
            contact_suffix: self.contact_suffix,
            slot: self.slot,
            created_at: self.created_at,
        }
    }
}

/// A persisted reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Store-assigned identifier
    pub id: ReservationId,
    /// Full name of the holder
    pub holder_name: String,
    /// Holder's group
    pub group_id: GroupId,
    /// Contact email
    pub email: String,
    /// Last four digits of the contact phone number
    pub contact_suffix: String,
    /// Reserved slot
    pub slot: SlotLabel,
    /// When the accept path created the record
    pub created_at: DateTime<Utc>,
}
