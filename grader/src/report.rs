//! # Grading Report Module
//!
//! The serializable result of one grading pass, shaped for API output:
//!
//! ```json
//! {
//!   "baseScore": 80.0,
//!   "totalPoints": 100.0,
//!   "score": 65.0,
//!   "percentage": 65,
//!   "violationPenalty": 15.0,
//!   "penaltyBreakdown": [
//!     { "type": "GHOST_TYPING_DETECTED", "count": 1, "penalty": 15.0, "maxReached": false }
//!   ],
//!   "status": "flagged",
//!   "answers": [
//!     { "questionNumber": 1, "isCorrect": true, "pointsEarned": 10.0, "pointsPossible": 10.0 }
//!   ]
//! }
//! ```
//!
//! A report is applied to a [`Submission`](crate::submission::Submission) through
//! [`Submission::finalize`](crate::submission::Submission::finalize).

use crate::error::GraderError;
use crate::submission::SubmissionStatus;
use crate::types::{Answer, PenaltyBreakdownEntry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingReport {
    pub base_score: f64,
    pub total_points: f64,
    pub score: f64,
    pub percentage: i64,
    pub violation_penalty: f64,
    pub penalty_breakdown: Vec<PenaltyBreakdownEntry>,
    pub status: SubmissionStatus,
    pub answers: Vec<Answer>,
}

/// A report plus the validation problems that were skipped to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingOutcome {
    pub report: GradingReport,
    pub issues: Vec<GraderError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_grading_report_serialization() {
        let report = GradingReport {
            base_score: 80.0,
            total_points: 100.0,
            score: 65.0,
            percentage: 65,
            violation_penalty: 15.0,
            penalty_breakdown: vec![PenaltyBreakdownEntry {
                kind: "GHOST_TYPING_DETECTED".into(),
                count: 1,
                penalty: 15.0,
                max_reached: false,
            }],
            status: SubmissionStatus::Flagged,
            answers: vec![Answer {
                question_number: 1,
                code: String::new(),
                output: String::new(),
                is_correct: true,
                points_earned: 10.0,
                points_possible: 10.0,
            }],
        };
        let value: Value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["baseScore"], 80.0);
        assert_eq!(value["percentage"], 65);
        assert_eq!(value["status"], "flagged");
        assert_eq!(value["penaltyBreakdown"][0]["type"], "GHOST_TYPING_DETECTED");
        assert_eq!(value["penaltyBreakdown"][0]["maxReached"], false);
        assert_eq!(value["answers"][0]["questionNumber"], 1);
        assert_eq!(value["answers"][0]["pointsPossible"], 10.0);
    }
}
