//! # Proctoring Session
//!
//! A caller-owned context that collects evidence for one exam attempt. It is
//! opened when the attempt starts and consumed by [`ProctorSession::close`],
//! which hands back everything that was gathered. Each attempt gets its own
//! session value; nothing is shared between sessions.

use crate::types::{ProctorReport, RawViolation, Violation};
use chrono::{DateTime, Utc};
use tracing::debug;

#[derive(Debug)]
pub struct ProctorSession {
    submission_id: i64,
    student_id: i64,
    exam_id: i64,
    opened_at: DateTime<Utc>,
    violations: Vec<Violation>,
    proctor_report: Option<ProctorReport>,
}

/// Everything a closed session collected.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvidence {
    pub submission_id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub violations: Vec<Violation>,
    pub proctor_report: Option<ProctorReport>,
}

impl ProctorSession {
    pub fn open(submission_id: i64, student_id: i64, exam_id: i64) -> Self {
        debug!(submission_id, student_id, exam_id, "proctoring session opened");
        Self {
            submission_id,
            student_id,
            exam_id,
            opened_at: Utc::now(),
            violations: Vec::new(),
            proctor_report: None,
        }
    }

    pub fn submission_id(&self) -> i64 {
        self.submission_id
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn record(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Normalizes and records a loosely-typed event.
    pub fn record_raw(&mut self, raw: RawViolation) {
        self.record(Violation::from_raw(raw));
    }

    /// Attaches the detector's summary. A later report replaces an earlier one.
    pub fn attach_report(&mut self, report: ProctorReport) {
        self.proctor_report = Some(report);
    }

    pub fn close(self) -> SessionEvidence {
        let closed_at = Utc::now();
        debug!(
            submission_id = self.submission_id,
            violations = self.violations.len(),
            has_report = self.proctor_report.is_some(),
            "proctoring session closed"
        );
        SessionEvidence {
            submission_id: self.submission_id,
            student_id: self.student_id,
            exam_id: self.exam_id,
            opened_at: self.opened_at,
            closed_at,
            violations: self.violations,
            proctor_report: self.proctor_report,
        }
    }
}
