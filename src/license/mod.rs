//! License record, status engine and transition results.

pub mod record;
pub mod status;

use record::LicenseRecord;

/// Outcome code of a lifecycle operation, for the transport layer to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// A new record was built.
    Created,
    /// The record was already in the target state; nothing changed.
    Unchanged,
    /// The record changed.
    Updated,
}

/// Record snapshot produced by a lifecycle operation, with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The resulting record. Equal to the input when `Unchanged`.
    pub record: LicenseRecord,
    /// What happened.
    pub outcome: Outcome,
}

impl Transition {
    pub(crate) fn created(record: LicenseRecord) -> Self {
        Self {
            record,
            outcome: Outcome::Created,
        }
    }

    pub(crate) fn updated(record: LicenseRecord) -> Self {
        Self {
            record,
            outcome: Outcome::Updated,
        }
    }

    pub(crate) fn unchanged(record: &LicenseRecord) -> Self {
        Self {
            record: record.clone(),
            outcome: Outcome::Unchanged,
        }
    }

    /// Whether the caller needs to persist the record.
    pub fn changed(&self) -> bool {
        self.outcome != Outcome::Unchanged
    }
}
