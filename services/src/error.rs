use grader::error::GraderError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the submission service and its repositories.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("Submission {0} not found")]
    SubmissionNotFound(i64),

    #[error("Exam {0} not found")]
    ExamNotFound(i64),

    /// The submission was already graded. Not retryable.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Violations were recorded after the grading pass read them. Retryable.
    #[error("Submission {0} received new violations while it was being graded")]
    StaleEvidence(i64),

    #[error(transparent)]
    Grader(GraderError),
}

impl From<GraderError> for ServiceError {
    fn from(err: GraderError) -> Self {
        match err {
            GraderError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Grader(other),
        }
    }
}
