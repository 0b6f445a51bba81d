//! # Submission Module
//!
//! The submission aggregate and its lifecycle.
//!
//! ```text
//! in_progress ──► submitted ────┐
//!      │                        │
//!      ├────────► flagged ──────┼──► reviewed
//!      │                        │
//!      └────────► under_review ─┘
//! ```
//!
//! Grading happens at most once: [`Submission::finalize`] only succeeds from
//! `in_progress`. Violations can only be appended while `in_progress`. Labels
//! are human ground truth and can be overwritten at any time.

use crate::error::GraderError;
use crate::report::GradingReport;
use crate::types::{Answer, PenaltyBreakdownEntry, ProctorReport, Violation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SubmissionStatus {
    /// Attempt open; evidence may still arrive.
    #[default]
    InProgress,
    /// Graded with no significant penalty.
    Submitted,
    /// Graded with a critical violation or a penalty above the flag threshold.
    Flagged,
    /// Graded with a penalty above the review threshold.
    UnderReview,
    /// A human has reviewed the result.
    Reviewed,
}

impl SubmissionStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (InProgress, Submitted | Flagged | UnderReview)
                | (Submitted | Flagged | UnderReview, Reviewed)
        )
    }

    pub fn is_open(self) -> bool {
        self == SubmissionStatus::InProgress
    }
}

/// Human-assigned ground truth.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Label {
    #[default]
    Unlabeled,
    Genuine,
    Cheating,
}

/// One student's attempt at one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub penalty_breakdown: Vec<PenaltyBreakdownEntry>,
    #[serde(default)]
    pub proctor_report: Option<ProctorReport>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub violation_penalty: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub total_points: f64,
    #[serde(default)]
    pub percentage: i64,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub label: Label,
    #[serde(default)]
    pub cheating_type: Option<String>,
    #[serde(default)]
    pub labeled_by: Option<String>,
    #[serde(default)]
    pub labeled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Opens a new attempt in `in_progress`.
    pub fn start(id: i64, student_id: i64, exam_id: i64) -> Self {
        Self {
            id,
            student_id,
            exam_id,
            answers: Vec::new(),
            violations: Vec::new(),
            penalty_breakdown: Vec::new(),
            proctor_report: None,
            base_score: 0.0,
            violation_penalty: 0.0,
            score: 0.0,
            total_points: 0.0,
            percentage: 0,
            status: SubmissionStatus::InProgress,
            label: Label::Unlabeled,
            cheating_type: None,
            labeled_by: None,
            labeled_at: None,
            reviewed_by: None,
            started_at: Utc::now(),
            submitted_at: None,
        }
    }

    fn ensure_open(&self, action: &str) -> Result<(), GraderError> {
        if self.status.is_open() {
            Ok(())
        } else {
            Err(GraderError::Conflict(format!(
                "Submission {} is already {}; cannot {}",
                self.id, self.status, action
            )))
        }
    }

    fn transition(&mut self, next: SubmissionStatus) -> Result<(), GraderError> {
        if !self.status.can_transition_to(next) {
            return Err(GraderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Appends evidence. Rejected once the submission has been graded.
    pub fn record_violation(&mut self, violation: Violation) -> Result<(), GraderError> {
        self.ensure_open("record violations")?;
        self.violations.push(violation);
        Ok(())
    }

    /// Applies a grading result and moves the submission to its graded status.
    ///
    /// Fails with [`GraderError::Conflict`] unless the submission is still
    /// `in_progress`; grading happens at most once.
    pub fn finalize(&mut self, report: GradingReport) -> Result<(), GraderError> {
        self.ensure_open("be graded again")?;
        self.transition(report.status)?;

        self.answers = report.answers;
        self.penalty_breakdown = report.penalty_breakdown;
        self.base_score = report.base_score;
        self.violation_penalty = report.violation_penalty;
        self.score = report.score;
        self.total_points = report.total_points;
        self.percentage = report.percentage;
        self.submitted_at = Some(Utc::now());

        info!(
            submission_id = self.id,
            status = %self.status,
            score = self.score,
            penalty = self.violation_penalty,
            "submission finalized"
        );
        Ok(())
    }

    /// Human override after grading.
    pub fn mark_reviewed(&mut self, reviewer: impl Into<String>) -> Result<(), GraderError> {
        self.transition(SubmissionStatus::Reviewed)?;
        self.reviewed_by = Some(reviewer.into());
        Ok(())
    }

    /// Sets (or overwrites) the ground-truth label.
    ///
    /// `cheating_type` is only kept for [`Label::Cheating`].
    pub fn apply_label(
        &mut self,
        label: Label,
        cheating_type: Option<String>,
        labeled_by: impl Into<String>,
        labeled_at: DateTime<Utc>,
    ) {
        self.label = label;
        self.cheating_type = match label {
            Label::Cheating => cheating_type,
            _ => None,
        };
        self.labeled_by = Some(labeled_by.into());
        self.labeled_at = Some(labeled_at);
    }
}
