//! Groups and the roster they are declared in.
//!
//! A [`Group`] is a population that competes for seats (a department, a team,
//! a class). Groups are immutable and declared once at process start as an
//! ordered [`Roster`]. Roster order matters: it is the tie-breaker for the
//! quota allocator and the default display order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `GroupId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid group ID: {0}")]
pub struct ParseGroupIdError(String);

/// Identifier of a group, e.g. `"internal"` or `"pediatrics"`.
///
/// # Validation
///
/// - `FromStr::from_str()`: Validates input (rejects empty strings)
/// - `From::from()` and `new()`: No validation (for trusted input)
///
/// # Examples
///
/// ```
/// use slotbook_core::group::GroupId;
///
/// let id = GroupId::new("surgery");
/// assert_eq!(id.as_str(), "surgery");
///
/// let parsed: GroupId = "ent".parse().unwrap();
/// assert_eq!(parsed, GroupId::new("ent"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Create a new `GroupId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the group ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = ParseGroupIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseGroupIdError("Group ID cannot be empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A population competing for seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Stable identifier, referenced by reservations
    pub id: GroupId,
    /// Human readable name
    pub display_name: String,
    /// Head count used for proportional quotas
    pub population: u32,
}

impl Group {
    /// Creates a new `Group`
    #[must_use]
    pub fn new(id: impl Into<GroupId>, display_name: impl Into<String>, population: u32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            population,
        }
    }
}

/// Errors raised while building a [`Roster`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// A group was declared with an empty id.
    #[error("Group at position {0} has an empty id")]
    EmptyId(usize),

    /// The same id was declared twice.
    #[error("Duplicate group id: {0}")]
    DuplicateId(GroupId),
}

/// Ordered, immutable list of groups with unique ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    groups: Vec<Group>,
}

impl Roster {
    /// Builds a roster, rejecting empty or duplicate ids.
    ///
    /// # Errors
    ///
    /// - [`RosterError::EmptyId`] if a group id is the empty string
    /// - [`RosterError::DuplicateId`] if two groups share an id
    pub fn new(groups: Vec<Group>) -> Result<Self, RosterError> {
        let mut seen = HashSet::with_capacity(groups.len());
        for (position, group) in groups.iter().enumerate() {
            if group.id.as_str().is_empty() {
                return Err(RosterError::EmptyId(position));
            }
            if !seen.insert(&group.id) {
                return Err(RosterError::DuplicateId(group.id.clone()));
            }
        }
        Ok(Self { groups })
    }

    /// Groups in declaration order.
    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Looks up a group by id.
    #[must_use]
    pub fn get(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| &group.id == id)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// `true` if the roster declares no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum of all group populations.
    #[must_use]
    pub fn total_population(&self) -> u64 {
        self.groups.iter().map(|group| u64::from(group.population)).sum()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let groups = Vec::<Group>::deserialize(deserializer)?;
        Self::new(groups).map_err(serde::de::Error::custom)
    }
}
