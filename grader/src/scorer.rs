//! # Scorer Module
//!
//! Final-score arithmetic and the status rule applied at submission time.
//!
//! - `score = max(0, base_score - violation_penalty)`, never negative.
//! - `percentage = round(score / total_points * 100)`, `0` when `total_points` is `0`.
//!   The percentage is deliberately not clamped to 100: answers worth more than the
//!   recomputed total surface as a percentage above 100 instead of being hidden.
//! - Status: `flagged` on any critical violation or a penalty above the flag
//!   threshold, else `under_review` above the review threshold, else `submitted`.

use crate::penalty::PenaltyAssessment;
use crate::submission::SubmissionStatus;

/// Round a float to two decimal places. Negative zero comes back as `0.0`.
#[inline]
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0 + 0.0
}

/// Thresholds for the submission-time status rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingPolicy {
    /// Penalty strictly above this flags the submission.
    pub flag_threshold: f64,
    /// Penalty strictly above this sends the submission for review.
    pub review_threshold: f64,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            flag_threshold: 30.0,
            review_threshold: 15.0,
        }
    }
}

impl GradingPolicy {
    pub fn from_config(config: &common::config::Config) -> Self {
        Self {
            flag_threshold: config.flag_penalty_threshold,
            review_threshold: config.review_penalty_threshold,
        }
    }

    /// The critical-violation rule dominates the penalty thresholds.
    pub fn status_for(&self, assessment: &PenaltyAssessment) -> SubmissionStatus {
        if assessment.critical_detected || assessment.total > self.flag_threshold {
            SubmissionStatus::Flagged
        } else if assessment.total > self.review_threshold {
            SubmissionStatus::UnderReview
        } else {
            SubmissionStatus::Submitted
        }
    }
}

/// Score after deducting the violation penalty, floored at zero.
pub fn final_score(base_score: f64, violation_penalty: f64) -> f64 {
    round2((base_score - violation_penalty).max(0.0))
}

/// Whole-number percentage of `score` over `total_points`.
///
/// # Example
///
/// ```
/// use grader::scorer::compute_percentage;
///
/// assert_eq!(compute_percentage(80.0, 100.0), 80);
/// assert_eq!(compute_percentage(2.0, 3.0), 67);
/// assert_eq!(compute_percentage(5.0, 0.0), 0);
/// ```
pub fn compute_percentage(score: f64, total_points: f64) -> i64 {
    if total_points <= 0.0 {
        return 0;
    }
    (score / total_points * 100.0).round() as i64
}
