//! The built-in department roster and roster loading.

use crate::config::ConfigError;
use slotbook_core::group::{Group, Roster, RosterError};
use std::path::Path;

/// Departments and head counts of the built-in roster, in display order.
const DEPARTMENTS: &[(&str, &str, u32)] = &[
    ("internal", "Internal Medicine", 33),
    ("pediatrics", "Pediatrics", 5),
    ("surgery", "Surgery", 8),
    ("derma", "Dermatology", 4),
    ("ent", "Otolaryngology", 4),
    ("urology", "Urology", 5),
    ("er", "Emergency Medicine", 7),
    ("family", "Family Medicine", 8),
    ("pathology", "Pathology", 1),
    ("neurosurgery", "Neurosurgery", 7),
    ("neurology", "Neurology", 5),
    ("ortho", "Orthopedics", 5),
    ("obgyn", "Obstetrics and Gynecology", 9),
    ("anesthesiology", "Anesthesiology", 6),
    ("rad_onc", "Radiation Oncology", 3),
    ("rehab", "Rehabilitation", 4),
    ("radiology", "Radiology", 6),
];

/// The built-in roster: 17 departments, 120 people.
///
/// # Errors
///
/// Returns [`RosterError`] only if the built-in table is edited into an
/// invalid state.
pub fn default_roster() -> Result<Roster, RosterError> {
    Roster::new(
        DEPARTMENTS
            .iter()
            .map(|&(id, name, population)| Group::new(id, name, population))
            .collect(),
    )
}

/// Loads the roster from `path`, or the built-in one when `path` is `None`.
///
/// The file is a JSON array of `{"id", "display_name", "population"}`
/// objects in display order.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed, or if it
/// declares an empty or duplicate id.
pub fn load_roster(path: Option<&Path>) -> Result<Roster, ConfigError> {
    let Some(path) = path else {
        return default_roster().map_err(ConfigError::from);
    };

    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadRoster {
        path: path.to_path_buf(),
        source,
    })?;
    let roster: Roster = serde_json::from_str(&json).map_err(|source| ConfigError::ParseRoster {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), groups = roster.len(), "Roster loaded");
    Ok(roster)
}
