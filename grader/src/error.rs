//! Grader Error Types
//!
//! [`GraderError`] covers every failure the engine can report. None of them is
//! fatal to the host process; each is scoped to a single submission.
//!
//! - [`GraderError::Validation`] is raised for a malformed question or answer. The grading
//!   pass recovers from it locally by skipping the offending entry and recording an issue.
//! - [`GraderError::Conflict`] is surfaced to the caller when a finalized submission is
//!   graded again or receives new evidence. It must not be retried.
//! - [`GraderError::InvalidTransition`] guards the submission state machine.
//!
//! # Example
//!
//! ```rust
//! use grader::error::GraderError;
//!
//! fn require_points(points: f64) -> Result<(), GraderError> {
//!     if points < 0.0 {
//!         return Err(GraderError::Validation("points must not be negative".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_points(-1.0).is_err());
//! ```

use crate::submission::SubmissionStatus;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraderError {
    /// A question or answer reference is malformed or unknown.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The submission is no longer in a state that accepts the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested lifecycle transition is not allowed.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}
