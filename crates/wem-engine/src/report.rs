//! Run report and warning aggregation
//!
//! Warnings are buffered for the whole run and rendered once at the end, so
//! operators get a single consolidated report instead of interleaved noise.
//! Integration mismatches are tabulated before the fatal abort they trigger.
//! All sinks take `&self`; reconciliation fans out concurrently within a
//! type.

use parking_lot::Mutex;

/// One non-fatal finding, tagged by the integration or element it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub subject: String,
    pub message: String,
}

/// An integration that could not be resolved in the destination workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationMismatch {
    pub key: String,
    pub name: String,
}

/// What the reconciler did with one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
    Reset,
    Applied,
    AppliedCustomized,
    SkippedCorrupted,
}

/// Per-action tallies for the final summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionCounts {
    pub created: usize,
    pub updated: usize,
    pub reset: usize,
    pub applied: usize,
    pub customized: usize,
    pub skipped: usize,
}

impl ActionCounts {
    /// Total elements touched
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.reset + self.applied + self.customized + self.skipped
    }
}

/// Aggregated outcome of one migration run.
#[derive(Debug, Default)]
pub struct RunReport {
    warnings: Mutex<Vec<Warning>>,
    mismatches: Mutex<Vec<IntegrationMismatch>>,
    counts: Mutex<ActionCounts>,
}

impl RunReport {
    /// Create an empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a warning (also logged immediately at warn level)
    pub fn warn(&self, subject: impl Into<String>, message: impl Into<String>) {
        let warning = Warning {
            subject: subject.into(),
            message: message.into(),
        };
        tracing::warn!(subject = %warning.subject, "{}", warning.message);
        self.warnings.lock().push(warning);
    }

    /// Record a reconciliation action
    pub fn record(&self, action: SyncAction) {
        let mut counts = self.counts.lock();
        match action {
            SyncAction::Created => counts.created += 1,
            SyncAction::Updated => counts.updated += 1,
            SyncAction::Reset => counts.reset += 1,
            SyncAction::Applied => counts.applied += 1,
            SyncAction::AppliedCustomized => counts.customized += 1,
            SyncAction::SkippedCorrupted => counts.skipped += 1,
        }
    }

    /// Record an unresolvable integration
    pub fn add_mismatch(&self, mismatch: IntegrationMismatch) {
        self.mismatches.lock().push(mismatch);
    }

    /// Whether the matcher phase accumulated mismatches
    #[must_use]
    pub fn has_mismatches(&self) -> bool {
        !self.mismatches.lock().is_empty()
    }

    /// Snapshot of the mismatch list
    #[must_use]
    pub fn mismatches(&self) -> Vec<IntegrationMismatch> {
        self.mismatches.lock().clone()
    }

    /// Snapshot of the buffered warnings
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().clone()
    }

    /// Snapshot of the action tallies
    #[must_use]
    pub fn counts(&self) -> ActionCounts {
        *self.counts.lock()
    }

    /// Fixed-width table of integration mismatches.
    #[must_use]
    pub fn mismatch_table(&self) -> String {
        let mismatches = self.mismatches.lock();
        let key_width = mismatches
            .iter()
            .map(|m| m.key.len())
            .chain(std::iter::once("key".len()))
            .max()
            .unwrap_or(3);

        let mut table = format!("{:key_width$}  name\n", "key");
        for mismatch in mismatches.iter() {
            table.push_str(&format!("{:key_width$}  {}\n", mismatch.key, mismatch.name));
        }
        table
    }

    /// Consolidated end-of-run summary: tallies first, then every buffered
    /// warning grouped under one heading.
    #[must_use]
    pub fn render(&self) -> String {
        let counts = self.counts();
        let mut out = format!(
            "created {}, updated {}, reset {}, applied {}, customized {}, skipped {}",
            counts.created,
            counts.updated,
            counts.reset,
            counts.applied,
            counts.customized,
            counts.skipped,
        );

        let warnings = self.warnings.lock();
        if !warnings.is_empty() {
            out.push_str(&format!("\nwarnings ({}):", warnings.len()));
            for warning in warnings.iter() {
                out.push_str(&format!("\n  [{}] {}", warning.subject, warning.message));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_action() {
        let report = RunReport::new();
        report.record(SyncAction::Created);
        report.record(SyncAction::Created);
        report.record(SyncAction::Reset);
        report.record(SyncAction::SkippedCorrupted);

        let counts = report.counts();
        assert_eq!(counts.created, 2);
        assert_eq!(counts.reset, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn warnings_buffer_in_order() {
        let report = RunReport::new();
        report.warn("salesforce", "connector version drift");
        report.warn("hubspot", "corrupted, migrate manually");

        let warnings = report.warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].subject, "salesforce");

        let rendered = report.render();
        assert!(rendered.contains("warnings (2):"));
        assert!(rendered.contains("[hubspot] corrupted, migrate manually"));
    }

    #[test]
    fn mismatch_table_is_aligned() {
        let report = RunReport::new();
        report.add_mismatch(IntegrationMismatch {
            key: "custom-crm".into(),
            name: "Custom CRM".into(),
        });
        report.add_mismatch(IntegrationMismatch {
            key: "sf".into(),
            name: "Salesforce".into(),
        });

        let table = report.mismatch_table();
        let lines: Vec<_> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("key"));
        assert!(lines[1].contains("custom-crm"));
        assert!(lines[2].starts_with("sf        "));
    }

    #[test]
    fn render_without_warnings_is_single_line() {
        let report = RunReport::new();
        report.record(SyncAction::Updated);
        assert_eq!(report.render().lines().count(), 1);
    }
}
