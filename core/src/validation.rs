//! Accept/reject decisions for booking candidates.
//!
//! The validator is a pure function of its inputs: the static slot registry,
//! the quota table, the candidate, and a reservation snapshot. It holds no
//! state of its own, so the caller decides which snapshot a decision is made
//! against.
//!
//! # Checks
//!
//! Run in this order; the first failing check is the reject reason:
//!
//! 1. the slot exists and is bookable
//! 2. the slot has a free place (occupancy < capacity)
//! 3. identity fields are present and well-formed: name, group, email,
//!    four-digit contact suffix
//! 4. the group has a free seat (usage < quota)
//! 5. no existing reservation shares the name, the email, or the suffix
//!
//! # Confirm-then-commit
//!
//! The store is shared and other clients write to it concurrently, so the
//! snapshot a candidate was validated against can be stale by the time the
//! write is issued. [`ReservationValidator::confirm`] re-runs the checks that
//! depend on other clients' writes (2, 4 and 5) against the freshest snapshot
//! right before the write. This narrows the race window but cannot close it:
//! two clients confirming against the same snapshot can both succeed and
//! over-allocate a slot or a quota by a small margin.

use crate::allocation::QuotaTable;
use crate::group::GroupId;
use crate::reservation::{Candidate, NewReservation};
use crate::slot::{SlotLabel, SlotRegistry};
use crate::snapshot::ReservationSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of the contact-number suffix.
pub const CONTACT_SUFFIX_LEN: usize = 4;

/// Identity fields a candidate must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityField {
    /// Holder's full name
    Name,
    /// Holder's group
    Group,
    /// Contact email
    Email,
    /// Last digits of the contact phone number
    ContactSuffix,
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Group => write!(f, "group"),
            Self::Email => write!(f, "email"),
            Self::ContactSuffix => write!(f, "contact suffix"),
        }
    }
}

/// Why a candidate was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The slot label is not in the registry.
    UnknownSlot(SlotLabel),
    /// The slot exists but never accepts reservations.
    SlotNotBookable(SlotLabel),
    /// Every place in the slot is taken.
    SlotFull {
        /// Requested slot
        slot: SlotLabel,
        /// Its concurrent-occupant limit
        capacity: u32,
    },
    /// A required identity field was left empty.
    MissingField(IdentityField),
    /// The email is not shaped `local@domain`.
    MalformedEmail(String),
    /// The contact suffix is not exactly four digits.
    MalformedContactSuffix(String),
    /// The group is not in the quota table.
    UnknownGroup(GroupId),
    /// The group already holds all of its seats.
    GroupFull {
        /// Candidate's group
        group: GroupId,
        /// The group's quota
        quota: u32,
    },
    /// An existing reservation already uses this identity value.
    Duplicate {
        /// Which field collided
        field: IdentityField,
        /// The colliding value
        value: String,
    },
}

impl RejectReason {
    /// Short, stable code for logs and metric labels.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownSlot(_) => "unknown_slot",
            Self::SlotNotBookable(_) => "slot_not_bookable",
            Self::SlotFull { .. } => "slot_full",
            Self::MissingField(_) => "missing_field",
            Self::MalformedEmail(_) => "malformed_email",
            Self::MalformedContactSuffix(_) => "malformed_contact_suffix",
            Self::UnknownGroup(_) => "unknown_group",
            Self::GroupFull { .. } => "group_full",
            Self::Duplicate { .. } => "duplicate_identity",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlot(slot) => write!(f, "slot {slot} does not exist"),
            Self::SlotNotBookable(slot) => write!(f, "slot {slot} cannot be booked"),
            Self::SlotFull { slot, capacity } => {
                write!(f, "slot {slot} is full ({capacity} places)")
            }
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::MalformedEmail(email) => write!(f, "email [{email}] is not valid"),
            Self::MalformedContactSuffix(_) => write!(
                f,
                "contact suffix must be the last {CONTACT_SUFFIX_LEN} digits"
            ),
            Self::UnknownGroup(group) => write!(f, "group {group} does not exist"),
            Self::GroupFull { group, quota } => {
                write!(f, "group {group} has used all {quota} of its seats")
            }
            Self::Duplicate { field, value } => {
                write!(f, "{field} [{value}] already has a reservation")
            }
        }
    }
}

/// A rejected candidate. Local and recoverable: nothing was written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Reservation rejected: {reason}")]
pub struct ValidationError {
    /// Why the candidate was rejected
    pub reason: RejectReason,
}

impl From<RejectReason> for ValidationError {
    fn from(reason: RejectReason) -> Self {
        Self { reason }
    }
}

/// Decides whether a candidate may be booked.
///
/// Borrows the static inputs; snapshots are passed per call.
#[derive(Clone, Copy, Debug)]
pub struct ReservationValidator<'a> {
    registry: &'a SlotRegistry,
    quotas: &'a QuotaTable,
}

impl<'a> ReservationValidator<'a> {
    /// Creates a validator over a schedule and its quota table.
    #[must_use]
    pub const fn new(registry: &'a SlotRegistry, quotas: &'a QuotaTable) -> Self {
        Self { registry, quotas }
    }

    /// Runs every check against `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ValidationError`].
    pub fn validate(
        &self,
        candidate: &Candidate,
        snapshot: &ReservationSnapshot,
    ) -> Result<(), ValidationError> {
        let capacity = self.check_slot_bookable(&candidate.slot)?;
        check_slot_has_room(&candidate.slot, capacity, snapshot)?;
        let group = self.check_identity(candidate)?;
        self.check_group_has_room(group, snapshot)?;
        check_not_duplicate(candidate, snapshot)?;
        Ok(())
    }

    /// Re-runs the checks that other clients' writes can invalidate (slot
    /// room, group room, duplicates) against a fresher snapshot.
    ///
    /// Assumes `candidate` already passed [`Self::validate`]; an unknown slot
    /// or group still fails rather than being waved through.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ValidationError`].
    pub fn confirm(
        &self,
        candidate: &Candidate,
        snapshot: &ReservationSnapshot,
    ) -> Result<(), ValidationError> {
        let capacity = self
            .registry
            .capacity_of(&candidate.slot)
            .ok_or_else(|| RejectReason::UnknownSlot(candidate.slot.clone()))?;
        check_slot_has_room(&candidate.slot, capacity, snapshot)?;
        let group = candidate
            .group_id
            .as_ref()
            .ok_or(RejectReason::MissingField(IdentityField::Group))?;
        self.check_group_has_room(group, snapshot)?;
        check_not_duplicate(candidate, snapshot)?;
        Ok(())
    }

    /// Validates `candidate` and, on success, turns it into the record to
    /// write, stamped with `created_at`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ValidationError`].
    pub fn accept(
        &self,
        candidate: &Candidate,
        snapshot: &ReservationSnapshot,
        created_at: DateTime<Utc>,
    ) -> Result<NewReservation, ValidationError> {
        self.validate(candidate, snapshot)?;
        let group_id = candidate
            .group_id
            .clone()
            .ok_or(RejectReason::MissingField(IdentityField::Group))?;
        Ok(NewReservation {
            holder_name: candidate.holder_name.clone(),
            group_id,
            email: candidate.email.clone(),
            contact_suffix: candidate.contact_suffix.clone(),
            slot: candidate.slot.clone(),
            created_at,
        })
    }

    fn check_slot_bookable(&self, slot: &SlotLabel) -> Result<u32, RejectReason> {
        match self.registry.get(slot) {
            None => Err(RejectReason::UnknownSlot(slot.clone())),
            Some(time_slot) if !time_slot.bookable => {
                Err(RejectReason::SlotNotBookable(slot.clone()))
            }
            Some(time_slot) => Ok(time_slot.capacity),
        }
    }

    fn check_identity<'c>(&self, candidate: &'c Candidate) -> Result<&'c GroupId, RejectReason> {
        if candidate.holder_name.is_empty() {
            return Err(RejectReason::MissingField(IdentityField::Name));
        }
        let group = match &candidate.group_id {
            Some(group) if !group.as_str().is_empty() => group,
            _ => return Err(RejectReason::MissingField(IdentityField::Group)),
        };
        if self.quotas.get(group).is_none() {
            return Err(RejectReason::UnknownGroup(group.clone()));
        }
        if candidate.email.is_empty() {
            return Err(RejectReason::MissingField(IdentityField::Email));
        }
        if !is_email_shaped(&candidate.email) {
            return Err(RejectReason::MalformedEmail(candidate.email.clone()));
        }
        if candidate.contact_suffix.is_empty() {
            return Err(RejectReason::MissingField(IdentityField::ContactSuffix));
        }
        if !is_contact_suffix(&candidate.contact_suffix) {
            return Err(RejectReason::MalformedContactSuffix(
                candidate.contact_suffix.clone(),
            ));
        }
        Ok(group)
    }

    fn check_group_has_room(
        &self,
        group: &GroupId,
        snapshot: &ReservationSnapshot,
    ) -> Result<(), RejectReason> {
        let quota = self
            .quotas
            .quota_of(group)
            .ok_or_else(|| RejectReason::UnknownGroup(group.clone()))?;
        if snapshot.group_usage(group) >= quota {
            return Err(RejectReason::GroupFull {
                group: group.clone(),
                quota,
            });
        }
        Ok(())
    }
}

fn check_slot_has_room(
    slot: &SlotLabel,
    capacity: u32,
    snapshot: &ReservationSnapshot,
) -> Result<(), RejectReason> {
    if snapshot.occupancy(slot) >= capacity {
        return Err(RejectReason::SlotFull {
            slot: slot.clone(),
            capacity,
        });
    }
    Ok(())
}

fn check_not_duplicate(
    candidate: &Candidate,
    snapshot: &ReservationSnapshot,
) -> Result<(), RejectReason> {
    match snapshot.find_duplicate(candidate) {
        None => Ok(()),
        Some(field) => {
            let value = match field {
                IdentityField::Name => candidate.holder_name.clone(),
                IdentityField::Email => candidate.email.clone(),
                IdentityField::ContactSuffix => candidate.contact_suffix.clone(),
                IdentityField::Group => String::new(),
            };
            Err(RejectReason::Duplicate { field, value })
        }
    }
}

/// Exactly [`CONTACT_SUFFIX_LEN`] ASCII digits.
fn is_contact_suffix(value: &str) -> bool {
    value.len() == CONTACT_SUFFIX_LEN && value.bytes().all(|b| b.is_ascii_digit())
}

/// `local@domain`, both parts non-empty, no whitespace.
fn is_email_shaped(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    matches!(value.split_once('@'), Some((local, domain))
        if !local.is_empty() && !domain.is_empty() && !domain.contains('@'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Panics: tests fail loudly on bad fixtures
mod tests {
    use super::*;
    use crate::allocation::allocate;
    use crate::group::{Group, Roster};
    use crate::reservation::{Reservation, ReservationId};
    use crate::slot::TimeSlot;

    const OPEN: &str = "10:00 - 10:30";
    const OTHER: &str = "10:30 - 11:00";
    const BLOCKED: &str = "11:30 - 11:50";

    struct Fixture {
        registry: SlotRegistry,
        quotas: QuotaTable,
    }

    impl Fixture {
        // A=10, B=5, C=5 over 10 seats -> quotas 4, 3, 3
        fn new() -> Self {
            let registry = SlotRegistry::new(vec![
                TimeSlot::bookable(OPEN, 30),
                TimeSlot::bookable(OTHER, 30),
                TimeSlot::blocked(BLOCKED, 20),
                TimeSlot::bookable("13:00 - 13:30", 30).with_capacity(6),
            ])
            .unwrap();
            let roster = Roster::new(vec![
                Group::new("a", "A", 10),
                Group::new("b", "B", 5),
                Group::new("c", "C", 5),
            ])
            .unwrap();
            let quotas = allocate(&roster, registry.total_bookable_capacity()).unwrap();
            Self { registry, quotas }
        }

        fn validator(&self) -> ReservationValidator<'_> {
            ReservationValidator::new(&self.registry, &self.quotas)
        }
    }

    fn booked(n: usize, group: &str, slot: &str) -> Reservation {
        Reservation {
            id: ReservationId::new(format!("r{n}")),
            holder_name: format!("holder {n}"),
            group_id: GroupId::new(group),
            email: format!("holder{n}@example.com"),
            contact_suffix: format!("{:04}", 9000 + n),
            slot: SlotLabel::new(slot),
            created_at: Utc::now(),
        }
    }

    fn candidate(slot: &str) -> Candidate {
        Candidate::new("Grace", "b", "grace@example.com", "1234", slot)
    }

    fn reason(result: Result<(), ValidationError>) -> RejectReason {
        result.unwrap_err().reason
    }

    #[test]
    fn fresh_candidate_is_accepted() {
        let fixture = Fixture::new();
        let validator = fixture.validator();
        let snapshot = ReservationSnapshot::empty();

        assert!(validator.validate(&candidate(OPEN), &snapshot).is_ok());

        let created_at = Utc::now();
        let record = validator
            .accept(&candidate(OPEN), &snapshot, created_at)
            .unwrap();
        assert_eq!(record.group_id, GroupId::new("b"));
        assert_eq!(record.created_at, created_at);
    }

    #[test]
    fn blocked_slot_is_rejected_before_anything_else() {
        let fixture = Fixture::new();
        let blank = Candidate {
            slot: SlotLabel::new(BLOCKED),
            ..Candidate::default()
        };
        assert_eq!(
            reason(fixture.validator().validate(&blank, &ReservationSnapshot::empty())),
            RejectReason::SlotNotBookable(SlotLabel::new(BLOCKED))
        );
    }

    #[test]
    fn unknown_slot_is_rejected() {
        let fixture = Fixture::new();
        assert_eq!(
            reason(
                fixture
                    .validator()
                    .validate(&candidate("03:00 - 03:30"), &ReservationSnapshot::empty())
            ),
            RejectReason::UnknownSlot(SlotLabel::new("03:00 - 03:30"))
        );
    }

    #[test]
    fn blank_candidate_names_no_slot() {
        let fixture = Fixture::new();
        assert_eq!(
            reason(
                fixture
                    .validator()
                    .validate(&Candidate::default(), &ReservationSnapshot::empty())
            ),
            RejectReason::UnknownSlot(SlotLabel::default())
        );
    }

    #[test]
    fn full_slot_rejects_even_when_group_has_room() {
        let fixture = Fixture::new();
        let snapshot = ReservationSnapshot::new(vec![booked(1, "a", OPEN), booked(2, "c", OPEN)]);

        assert_eq!(
            reason(fixture.validator().validate(&candidate(OPEN), &snapshot)),
            RejectReason::SlotFull {
                slot: SlotLabel::new(OPEN),
                capacity: 2
            }
        );
        // Same candidate, another slot: fine.
        assert!(fixture.validator().validate(&candidate(OTHER), &snapshot).is_ok());
    }

    #[test]
    fn full_slot_is_reported_before_missing_fields() {
        let fixture = Fixture::new();
        let snapshot = ReservationSnapshot::new(vec![booked(1, "a", OPEN), booked(2, "c", OPEN)]);
        let blank = Candidate {
            slot: SlotLabel::new(OPEN),
            ..Candidate::default()
        };
        assert_eq!(
            reason(fixture.validator().validate(&blank, &snapshot)).code(),
            "slot_full"
        );
    }

    #[test]
    fn identity_fields_are_checked_in_order() {
        let fixture = Fixture::new();
        let validator = fixture.validator();
        let empty = ReservationSnapshot::empty();

        let mut c = Candidate {
            slot: SlotLabel::new(OPEN),
            ..Candidate::default()
        };
        assert_eq!(
            reason(validator.validate(&c, &empty)),
            RejectReason::MissingField(IdentityField::Name)
        );

        c.holder_name = "Grace".to_string();
        assert_eq!(
            reason(validator.validate(&c, &empty)),
            RejectReason::MissingField(IdentityField::Group)
        );

        c.group_id = Some(GroupId::new("nope"));
        assert_eq!(
            reason(validator.validate(&c, &empty)),
            RejectReason::UnknownGroup(GroupId::new("nope"))
        );

        c.group_id = Some(GroupId::new("b"));
        assert_eq!(
            reason(validator.validate(&c, &empty)),
            RejectReason::MissingField(IdentityField::Email)
        );

        c.email = "grace.example.com".to_string();
        assert_eq!(
            reason(validator.validate(&c, &empty)),
            RejectReason::MalformedEmail("grace.example.com".to_string())
        );

        c.email = "grace@example.com".to_string();
        assert_eq!(
            reason(validator.validate(&c, &empty)),
            RejectReason::MissingField(IdentityField::ContactSuffix)
        );

        for bad in ["123", "12345", "12a4", "１２３４", " 123"] {
            c.contact_suffix = bad.to_string();
            assert_eq!(
                reason(validator.validate(&c, &empty)),
                RejectReason::MalformedContactSuffix(bad.to_string()),
                "suffix {bad:?} should be malformed"
            );
        }

        c.contact_suffix = "0042".to_string();
        assert!(validator.validate(&c, &empty).is_ok());
    }

    #[test]
    fn full_group_rejects_even_when_slots_are_open() {
        let fixture = Fixture::new();
        // Group b has quota 3
        let snapshot = ReservationSnapshot::new(vec![
            booked(1, "b", OTHER),
            booked(2, "b", "13:00 - 13:30"),
            booked(3, "b", "13:00 - 13:30"),
        ]);

        assert_eq!(
            reason(fixture.validator().validate(&candidate(OPEN), &snapshot)),
            RejectReason::GroupFull {
                group: GroupId::new("b"),
                quota: 3
            }
        );
    }

    #[test]
    fn suffix_collision_alone_is_a_duplicate() {
        let fixture = Fixture::new();
        let mut existing = booked(1, "a", OTHER);
        existing.contact_suffix = "1234".to_string();
        let snapshot = ReservationSnapshot::new(vec![existing]);

        assert_eq!(
            reason(fixture.validator().validate(&candidate(OPEN), &snapshot)),
            RejectReason::Duplicate {
                field: IdentityField::ContactSuffix,
                value: "1234".to_string()
            }
        );
    }

    #[test]
    fn name_collision_is_reported_before_email() {
        let fixture = Fixture::new();
        let mut existing = booked(1, "a", OTHER);
        existing.holder_name = "Grace".to_string();
        existing.email = "grace@example.com".to_string();
        let snapshot = ReservationSnapshot::new(vec![existing]);

        assert_eq!(
            reason(fixture.validator().validate(&candidate(OPEN), &snapshot)),
            RejectReason::Duplicate {
                field: IdentityField::Name,
                value: "Grace".to_string()
            }
        );
    }

    #[test]
    fn confirm_catches_writes_made_after_validation() {
        let fixture = Fixture::new();
        let validator = fixture.validator();
        let c = candidate(OPEN);

        let stale = ReservationSnapshot::new(vec![booked(1, "a", OPEN)]);
        assert!(validator.validate(&c, &stale).is_ok());

        let fresh = ReservationSnapshot::new(vec![booked(1, "a", OPEN), booked(2, "c", OPEN)]);
        assert_eq!(reason(validator.confirm(&c, &fresh)).code(), "slot_full");
    }

    #[test]
    fn confirm_passes_on_unchanged_snapshot() {
        let fixture = Fixture::new();
        let snapshot = ReservationSnapshot::new(vec![booked(1, "a", OPEN)]);
        assert!(fixture.validator().confirm(&candidate(OPEN), &snapshot).is_ok());
    }

    #[test]
    fn reject_reason_messages_name_the_value() {
        let message = RejectReason::Duplicate {
            field: IdentityField::ContactSuffix,
            value: "1234".to_string(),
        }
        .to_string();
        assert!(message.contains("contact suffix"));
        assert!(message.contains("1234"));

        let error = ValidationError::from(RejectReason::MissingField(IdentityField::Name));
        assert!(error.to_string().contains("name is required"));
    }
}
