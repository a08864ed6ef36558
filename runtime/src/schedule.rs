//! The static booking inputs: slot registry and quota table.

use crate::error::BookingError;
use slotbook_core::allocation::{allocate, QuotaTable};
use slotbook_core::group::Roster;
use slotbook_core::slot::SlotRegistry;
use slotbook_core::validation::ReservationValidator;

/// A slot registry together with the quotas allocated over its capacity.
///
/// Built once at startup and shared (behind an `Arc`) by every session and
/// the admin console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    registry: SlotRegistry,
    quotas: QuotaTable,
}

impl Schedule {
    /// Allocates `roster` over the total bookable capacity of `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Allocation`] if the roster cannot be
    /// apportioned (empty, more groups than seats, no population).
    pub fn new(registry: SlotRegistry, roster: &Roster) -> Result<Self, BookingError> {
        let quotas = allocate(roster, registry.total_bookable_capacity())?;
        tracing::debug!(
            groups = quotas.entries().len(),
            seats = quotas.total_capacity(),
            "Quotas allocated"
        );
        Ok(Self { registry, quotas })
    }

    /// The slot registry.
    #[must_use]
    pub const fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// The quota table.
    #[must_use]
    pub const fn quotas(&self) -> &QuotaTable {
        &self.quotas
    }

    /// A validator over this schedule.
    #[must_use]
    pub const fn validator(&self) -> ReservationValidator<'_> {
        ReservationValidator::new(&self.registry, &self.quotas)
    }
}
