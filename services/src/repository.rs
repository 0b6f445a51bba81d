//! Storage seam for exams and submissions.
//!
//! The service only talks to [`SubmissionRepository`]. Every mutation of a
//! stored submission happens inside a single repository call, so implementations
//! decide how a read-check-write is made atomic. [`InMemorySubmissionRepository`]
//! does it under one write lock.

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grader::report::GradingReport;
use grader::submission::{Label, Submission};
use grader::types::{Exam, ProctorReport, Question, Violation};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Ground-truth label written by a reviewer.
#[derive(Debug, Clone)]
pub struct LabelUpdate {
    pub label: Label,
    pub cheating_type: Option<String>,
    pub labeled_by: String,
    pub labeled_at: DateTime<Utc>,
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create_exam(&self, title: String, questions: Vec<Question>) -> ServiceResult<Exam>;

    async fn find_exam(&self, id: i64) -> ServiceResult<Option<Exam>>;

    /// Stores a fresh `in_progress` submission and returns it with its id.
    async fn create_submission(&self, student_id: i64, exam_id: i64) -> ServiceResult<Submission>;

    async fn find(&self, id: i64) -> ServiceResult<Option<Submission>>;

    /// Snapshot of all submissions in id order.
    async fn list(&self) -> ServiceResult<Vec<Submission>>;

    /// Appends evidence to an open submission.
    async fn append_violations(
        &self,
        id: i64,
        violations: Vec<Violation>,
    ) -> ServiceResult<Submission>;

    /// Applies a grading result computed over the first `graded_violations`
    /// stored violations.
    ///
    /// Must fail with [`ServiceError::Conflict`] if another caller graded the
    /// submission first, and with [`ServiceError::StaleEvidence`] if more
    /// violations were stored since the grading pass read them.
    async fn finalize(
        &self,
        id: i64,
        graded_violations: usize,
        report: GradingReport,
        proctor_report: Option<ProctorReport>,
    ) -> ServiceResult<Submission>;

    /// Records a human review of a graded submission.
    async fn mark_reviewed(&self, id: i64, reviewer: String) -> ServiceResult<Submission>;

    async fn save_label(&self, id: i64, update: LabelUpdate) -> ServiceResult<Submission>;
}

#[derive(Debug, Default)]
struct Store {
    exams: HashMap<i64, Exam>,
    submissions: HashMap<i64, Submission>,
}

/// Process-local repository, used by tests and the offline tooling.
#[derive(Debug, Default)]
pub struct InMemorySubmissionRepository {
    store: RwLock<Store>,
    next_exam_id: AtomicI64,
    next_submission_id: AtomicI64,
}

impl InMemorySubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with already-existing submissions, e.g. from an export.
    pub fn with_submissions(submissions: Vec<Submission>) -> Self {
        let max_id = submissions.iter().map(|s| s.id).max().unwrap_or(0);
        Self {
            store: RwLock::new(Store {
                exams: HashMap::new(),
                submissions: submissions.into_iter().map(|s| (s.id, s)).collect(),
            }),
            next_exam_id: AtomicI64::new(0),
            next_submission_id: AtomicI64::new(max_id),
        }
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::SubmissionNotFound(id)
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn create_exam(&self, title: String, questions: Vec<Question>) -> ServiceResult<Exam> {
        let id = self.next_exam_id.fetch_add(1, Ordering::SeqCst) + 1;
        let exam = Exam {
            id,
            title,
            questions,
        };
        self.store.write().await.exams.insert(id, exam.clone());
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> ServiceResult<Option<Exam>> {
        Ok(self.store.read().await.exams.get(&id).cloned())
    }

    async fn create_submission(&self, student_id: i64, exam_id: i64) -> ServiceResult<Submission> {
        let id = self.next_submission_id.fetch_add(1, Ordering::SeqCst) + 1;
        let submission = Submission::start(id, student_id, exam_id);
        self.store
            .write()
            .await
            .submissions
            .insert(id, submission.clone());
        Ok(submission)
    }

    async fn find(&self, id: i64) -> ServiceResult<Option<Submission>> {
        Ok(self.store.read().await.submissions.get(&id).cloned())
    }

    async fn list(&self) -> ServiceResult<Vec<Submission>> {
        let store = self.store.read().await;
        let mut submissions: Vec<Submission> = store.submissions.values().cloned().collect();
        submissions.sort_by_key(|s| s.id);
        Ok(submissions)
    }

    async fn append_violations(
        &self,
        id: i64,
        violations: Vec<Violation>,
    ) -> ServiceResult<Submission> {
        let mut store = self.store.write().await;
        let submission = store.submissions.get_mut(&id).ok_or_else(|| not_found(id))?;
        for violation in violations {
            submission.record_violation(violation)?;
        }
        Ok(submission.clone())
    }

    async fn finalize(
        &self,
        id: i64,
        graded_violations: usize,
        report: GradingReport,
        proctor_report: Option<ProctorReport>,
    ) -> ServiceResult<Submission> {
        let mut store = self.store.write().await;
        let submission = store.submissions.get_mut(&id).ok_or_else(|| not_found(id))?;
        if submission.status.is_open() && submission.violations.len() != graded_violations {
            return Err(ServiceError::StaleEvidence(id));
        }
        submission.finalize(report)?;
        submission.proctor_report = proctor_report;
        Ok(submission.clone())
    }

    async fn mark_reviewed(&self, id: i64, reviewer: String) -> ServiceResult<Submission> {
        let mut store = self.store.write().await;
        let submission = store.submissions.get_mut(&id).ok_or_else(|| not_found(id))?;
        submission.mark_reviewed(reviewer)?;
        Ok(submission.clone())
    }

    async fn save_label(&self, id: i64, update: LabelUpdate) -> ServiceResult<Submission> {
        let mut store = self.store.write().await;
        let submission = store.submissions.get_mut(&id).ok_or_else(|| not_found(id))?;
        submission.apply_label(
            update.label,
            update.cheating_type,
            update.labeled_by,
            update.labeled_at,
        );
        Ok(submission.clone())
    }
}
