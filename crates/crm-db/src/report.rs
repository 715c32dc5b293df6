//! Out-of-band error reporting.
//!
//! Some failures must not fail the operation that hit them: a change-log
//! write that fails after its mutation committed, or a compensating delete
//! that fails after a document insert was rejected. Those go to an
//! [`ErrorReporter`] instead.

use std::sync::{Mutex, PoisonError};

/// A failure that was swallowed and needs operator attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incident {
    /// A mutation committed but its change-log entry could not be written.
    AuditWriteFailed {
        table_name: String,
        record_id: String,
        field_name: String,
        error: String,
    },
    /// An uploaded object could not be removed after its row was rejected.
    CompensationFailed {
        provider_path: String,
        error: String,
        original_error: String,
    },
}

pub trait ErrorReporter: Send + Sync {
    fn report(&self, incident: &Incident);
}

/// Default reporter: an `error!` event per incident.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, incident: &Incident) {
        match incident {
            Incident::AuditWriteFailed {
                table_name,
                record_id,
                field_name,
                error,
            } => tracing::error!(
                table_name,
                record_id,
                field_name,
                %error,
                "change log write failed; mutation kept"
            ),
            Incident::CompensationFailed {
                provider_path,
                error,
                original_error,
            } => tracing::error!(
                provider_path,
                %error,
                %original_error,
                "orphaned object: compensating delete failed"
            ),
        }
    }
}

/// Collects incidents in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    incidents: Mutex<Vec<Incident>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far, oldest first.
    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ErrorReporter for MemoryReporter {
    fn report(&self, incident: &Incident) {
        TracingReporter.report(incident);
        self.incidents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(incident.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_reporter_keeps_order() {
        let reporter = MemoryReporter::new();
        let first = Incident::AuditWriteFailed {
            table_name: "businesses".into(),
            record_id: "biz-1".into(),
            field_name: "creation".into(),
            error: "no such table".into(),
        };
        let second = Incident::CompensationFailed {
            provider_path: "/crm/1.pdf".into(),
            error: "timeout".into(),
            original_error: "FOREIGN KEY constraint failed".into(),
        };
        reporter.report(&first);
        reporter.report(&second);
        assert_eq!(reporter.incidents(), vec![first, second]);
    }
}
