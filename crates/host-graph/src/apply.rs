//! Best-effort property writes with a typed record of what happened.
//!
//! Host writes fail independently and routinely. Instead of swallowing
//! errors inline, every guarded write goes through [`FieldLog::try_apply`],
//! which records the field name and an [`ApplyOutcome`] in call order.

use serde::Serialize;

use crate::contract::HostResult;

/// Result of one guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The host accepted the write.
    Applied,
    /// The current value was already within tolerance; nothing written.
    Skipped,
    /// The host rejected the write; the previous value stays.
    Failed,
}

impl ApplyOutcome {
    pub fn is_applied(self) -> bool {
        self == ApplyOutcome::Applied
    }
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldEntry {
    pub field: String,
    pub outcome: ApplyOutcome,
}

/// Ordered record of guarded writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldLog {
    entries: Vec<FieldEntry>,
}

impl FieldLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `write`, record its outcome, never propagate its error.
    pub fn try_apply<F>(&mut self, field: impl Into<String>, write: F) -> ApplyOutcome
    where
        F: FnOnce() -> HostResult<()>,
    {
        let field = field.into();
        let outcome = match write() {
            Ok(()) => ApplyOutcome::Applied,
            Err(e) => {
                tracing::trace!(field = %field, error = %e, "Field write rejected");
                ApplyOutcome::Failed
            }
        };
        self.entries.push(FieldEntry { field, outcome });
        outcome
    }

    /// Like [`FieldLog::try_apply`] but records `Skipped` when `needed` is false.
    pub fn apply_if<F>(&mut self, field: impl Into<String>, needed: bool, write: F) -> ApplyOutcome
    where
        F: FnOnce() -> HostResult<()>,
    {
        if needed {
            self.try_apply(field, write)
        } else {
            self.skip(field)
        }
    }

    /// Record a write that was not attempted.
    pub fn skip(&mut self, field: impl Into<String>) -> ApplyOutcome {
        self.entries.push(FieldEntry {
            field: field.into(),
            outcome: ApplyOutcome::Skipped,
        });
        ApplyOutcome::Skipped
    }

    /// Outcome of the latest write to `field`.
    pub fn outcome(&self, field: &str) -> Option<ApplyOutcome> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.field == field)
            .map(|e| e.outcome)
    }

    /// Fields in the order they were attempted (skips included).
    pub fn order(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.field.as_str()).collect()
    }

    /// Fields the host accepted, in order.
    pub fn applied(&self) -> Vec<&str> {
        self.with_outcome(ApplyOutcome::Applied)
    }

    /// Fields the host rejected, in order.
    pub fn failed(&self) -> Vec<&str> {
        self.with_outcome(ApplyOutcome::Failed)
    }

    fn with_outcome(&self, outcome: ApplyOutcome) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.outcome == outcome)
            .map(|e| e.field.as_str())
            .collect()
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append another log's entries after this one's.
    pub fn extend(&mut self, other: FieldLog) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::HostError;

    #[test]
    fn failures_are_recorded_not_raised() {
        let mut log = FieldLog::new();
        assert_eq!(log.try_apply("frame_rate", || Ok(())), ApplyOutcome::Applied);
        assert_eq!(
            log.try_apply("duration", || Err(HostError::rejected("duration", "locked"))),
            ApplyOutcome::Failed
        );
        assert_eq!(log.apply_if("size", false, || Ok(())), ApplyOutcome::Skipped);

        assert_eq!(log.order(), vec!["frame_rate", "duration", "size"]);
        assert_eq!(log.applied(), vec!["frame_rate"]);
        assert_eq!(log.failed(), vec!["duration"]);
        assert_eq!(log.outcome("size"), Some(ApplyOutcome::Skipped));
        assert_eq!(log.outcome("missing"), None);
    }

    #[test]
    fn skipped_write_never_runs() {
        let mut log = FieldLog::new();
        let mut ran = false;
        log.apply_if("work_area", false, || {
            ran = true;
            Ok(())
        });
        assert!(!ran);
    }

    #[test]
    fn latest_outcome_wins() {
        let mut log = FieldLog::new();
        log.try_apply("numbering", || Err(HostError::unsupported("Starting #")));
        log.try_apply("numbering", || Ok(()));
        assert_eq!(log.outcome("numbering"), Some(ApplyOutcome::Applied));
    }
}
