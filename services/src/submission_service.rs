use crate::error::{ServiceError, ServiceResult};
use crate::repository::{LabelUpdate, SubmissionRepository};
use chrono::Utc;
use common::config::Config;
use grader::GradingJob;
use grader::error::GraderError;
use grader::evaluation::{self, DEFAULT_MIN_LABELED, EvaluationOutcome};
use grader::graders::heuristic::HeuristicGrader;
use grader::scorer::GradingPolicy;
use grader::session::SessionEvidence;
use grader::submission::{Label, Submission};
use grader::types::{AnswerInput, Exam, ProctorReport, Question, RawViolation, Violation};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Grading passes tried before a submission that keeps receiving violations
/// is rejected with [`ServiceError::StaleEvidence`].
pub const MAX_GRADING_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct CreateExam {
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub struct StartAttempt {
    pub student_id: i64,
    pub exam_id: i64,
}

#[derive(Debug, Clone)]
pub struct SubmitAnswers {
    pub submission_id: i64,
    pub answers: Vec<AnswerInput>,
    pub proctor_report: Option<ProctorReport>,
}

#[derive(Debug, Clone)]
pub struct LabelSubmission {
    pub submission_id: i64,
    pub label: Label,
    pub cheating_type: Option<String>,
    pub labeled_by: String,
}

/// A finalized submission plus whatever the grading pass had to skip.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedSubmission {
    pub submission: Submission,
    pub issues: Vec<GraderError>,
}

pub struct SubmissionService<R: SubmissionRepository> {
    repo: Arc<R>,
    grader: HeuristicGrader,
    policy: GradingPolicy,
    min_labeled: usize,
}

impl<R: SubmissionRepository> SubmissionService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            grader: HeuristicGrader::default(),
            policy: GradingPolicy::default(),
            min_labeled: DEFAULT_MIN_LABELED,
        }
    }

    pub fn from_config(repo: Arc<R>, config: &Config) -> Self {
        Self {
            repo,
            grader: HeuristicGrader::from_config(config),
            policy: GradingPolicy::from_config(config),
            min_labeled: config.evaluation_min_labeled,
        }
    }

    pub async fn create_exam(&self, params: CreateExam) -> ServiceResult<Exam> {
        self.repo.create_exam(params.title, params.questions).await
    }

    /// Opens a new `in_progress` attempt for an existing exam.
    pub async fn start_attempt(&self, params: StartAttempt) -> ServiceResult<Submission> {
        if self.repo.find_exam(params.exam_id).await?.is_none() {
            return Err(ServiceError::ExamNotFound(params.exam_id));
        }
        let submission = self
            .repo
            .create_submission(params.student_id, params.exam_id)
            .await?;
        info!(
            submission_id = submission.id,
            student_id = params.student_id,
            exam_id = params.exam_id,
            "attempt started"
        );
        Ok(submission)
    }

    pub async fn find(&self, id: i64) -> ServiceResult<Submission> {
        self.repo
            .find(id)
            .await?
            .ok_or(ServiceError::SubmissionNotFound(id))
    }

    /// Normalizes and appends violation records from any producer.
    pub async fn record_violations(
        &self,
        submission_id: i64,
        raw: Vec<RawViolation>,
    ) -> ServiceResult<Submission> {
        let violations: Vec<Violation> = raw.into_iter().map(Violation::from_raw).collect();
        self.repo.append_violations(submission_id, violations).await
    }

    /// Grades an open submission exactly once.
    ///
    /// The early status check only avoids wasted work; the repository's
    /// `finalize` is what rejects a concurrent second submission. When
    /// violations arrive while the pass runs, the submission is re-read and
    /// graded again so every stored violation is charged.
    pub async fn submit(&self, params: SubmitAnswers) -> ServiceResult<GradedSubmission> {
        let mut attempt = 1;
        loop {
            let current = self.find(params.submission_id).await?;
            if !current.status.is_open() {
                return Err(ServiceError::Conflict(format!(
                    "Submission {} is already {}",
                    current.id, current.status
                )));
            }
            let exam = self
                .repo
                .find_exam(current.exam_id)
                .await?
                .ok_or(ServiceError::ExamNotFound(current.exam_id))?;

            let outcome = GradingJob::new(&exam.questions, &params.answers, &current.violations)
                .with_proctor_report(params.proctor_report.as_ref())
                .with_grader(self.grader)
                .with_policy(self.policy)
                .grade();

            match self
                .repo
                .finalize(
                    params.submission_id,
                    current.violations.len(),
                    outcome.report,
                    params.proctor_report.clone(),
                )
                .await
            {
                Ok(submission) => {
                    return Ok(GradedSubmission {
                        submission,
                        issues: outcome.issues,
                    });
                }
                Err(ServiceError::StaleEvidence(id)) if attempt < MAX_GRADING_ATTEMPTS => {
                    debug!(
                        submission_id = id,
                        attempt,
                        "violations arrived during grading; regrading"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    warn!(submission_id = params.submission_id, %err, "submission rejected");
                    return Err(err);
                }
            }
        }
    }

    /// Submits using the evidence a closed proctoring session gathered.
    pub async fn submit_session(
        &self,
        evidence: SessionEvidence,
        answers: Vec<AnswerInput>,
    ) -> ServiceResult<GradedSubmission> {
        if !evidence.violations.is_empty() {
            self.repo
                .append_violations(evidence.submission_id, evidence.violations)
                .await?;
        }
        self.submit(SubmitAnswers {
            submission_id: evidence.submission_id,
            answers,
            proctor_report: evidence.proctor_report,
        })
        .await
    }

    pub async fn review(&self, submission_id: i64, reviewer: &str) -> ServiceResult<Submission> {
        self.repo
            .mark_reviewed(submission_id, reviewer.to_string())
            .await
    }

    /// Sets the ground-truth label. Labeling again overwrites.
    pub async fn label(&self, params: LabelSubmission) -> ServiceResult<Submission> {
        let submission = self
            .repo
            .save_label(
                params.submission_id,
                LabelUpdate {
                    label: params.label,
                    cheating_type: params.cheating_type,
                    labeled_by: params.labeled_by,
                    labeled_at: Utc::now(),
                },
            )
            .await?;
        info!(
            submission_id = submission.id,
            label = %submission.label,
            "submission labeled"
        );
        Ok(submission)
    }

    /// Evaluates every stored submission against its label.
    pub async fn evaluate(&self) -> ServiceResult<EvaluationOutcome> {
        let submissions = self.repo.list().await?;
        Ok(evaluation::evaluate(&submissions, self.min_labeled))
    }
}
