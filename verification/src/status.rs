use crate::step::next_step;
use idgate_store::{LivenessSummary, VerificationRecord};
use idgate_types::{StepId, VerificationStatus};
use serde::Serialize;

/// A record together with the values derived from it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusReport {
    pub record: VerificationRecord,
    pub status: VerificationStatus,
    pub status_label: &'static str,
    pub next_step: StepId,
    pub progress_percent: u8,
    pub liveness: LivenessSummary,
}

impl From<VerificationRecord> for StatusReport {
    fn from(record: VerificationRecord) -> Self {
        let status = record.status();
        Self {
            status,
            status_label: status.label(),
            next_step: next_step(&record),
            progress_percent: record.progress_percent(),
            liveness: record.liveness_summary(),
            record,
        }
    }
}
