use common::config::Config;
use grader::classifier::ViolationKind;
use grader::evaluation::EvaluationOutcome;
use grader::error::GraderError;
use grader::session::ProctorSession;
use grader::submission::{Label, SubmissionStatus};
use grader::types::{AnswerInput, ProctorReport, Question, RawViolation, ViolationBreakdown};
use services::error::ServiceError;
use services::repository::{InMemorySubmissionRepository, LabelUpdate, SubmissionRepository};
use services::submission_service::{
    CreateExam, GradedSubmission, LabelSubmission, MAX_GRADING_ATTEMPTS, StartAttempt,
    SubmissionService, SubmitAnswers,
};
use async_trait::async_trait;
use grader::report::GradingReport;
use grader::submission::Submission;
use grader::types::{Exam, Violation};
use services::error::ServiceResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const SOLUTION: &str = "fn solve(xs: &[i32]) -> i32 { xs.iter().copied().max().unwrap_or(0) }";

type Service = SubmissionService<InMemorySubmissionRepository>;

fn service() -> Service {
    SubmissionService::new(Arc::new(InMemorySubmissionRepository::new()))
}

/// An 80 + 20 point exam, returning its id.
async fn seed_exam(service: &Service) -> i64 {
    service
        .create_exam(CreateExam {
            title: "Midterm".into(),
            questions: vec![Question::new(1, 80.0), Question::new(2, 20.0)],
        })
        .await
        .unwrap()
        .id
}

async fn start(service: &Service, exam_id: i64, student_id: i64) -> i64 {
    service
        .start_attempt(StartAttempt {
            student_id,
            exam_id,
        })
        .await
        .unwrap()
        .id
}

/// Solves question 1 only, for a base score of 80 / 100.
fn answers() -> Vec<AnswerInput> {
    vec![AnswerInput::new(1, SOLUTION, "3 tests passed")]
}

fn raw(kind: &str) -> RawViolation {
    RawViolation {
        kind: kind.into(),
        ..Default::default()
    }
}

async fn submit(service: &Service, id: i64) -> Result<GradedSubmission, ServiceError> {
    service
        .submit(SubmitAnswers {
            submission_id: id,
            answers: answers(),
            proctor_report: None,
        })
        .await
}

#[tokio::test]
async fn test_clean_submission_is_submitted() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let graded = submit(&service, id).await.unwrap();
    let s = graded.submission;
    assert!(graded.issues.is_empty());
    assert_eq!(s.status, SubmissionStatus::Submitted);
    assert_eq!(s.base_score, 80.0);
    assert_eq!(s.total_points, 100.0);
    assert_eq!(s.violation_penalty, 0.0);
    assert_eq!(s.percentage, 80);
    assert!(s.submitted_at.is_some());
}

#[tokio::test]
async fn test_ghost_typing_flags_submission() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    service
        .record_violations(id, vec![raw("ghost_typing")])
        .await
        .unwrap();
    let s = submit(&service, id).await.unwrap().submission;

    assert_eq!(s.status, SubmissionStatus::Flagged);
    assert_eq!(s.violation_penalty, 15.0);
    assert_eq!(s.score, 65.0);
    assert_eq!(s.penalty_breakdown.len(), 1);
    assert_eq!(s.penalty_breakdown[0].kind, "GHOST_TYPING_DETECTED");
    assert_eq!(s.penalty_breakdown[0].count, 1);
    assert!(!s.penalty_breakdown[0].max_reached);
}

#[tokio::test]
async fn test_resubmission_and_late_violations_conflict() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;
    submit(&service, id).await.unwrap();

    let again = submit(&service, id).await.unwrap_err();
    assert!(matches!(again, ServiceError::Conflict(_)));

    let late = service
        .record_violations(id, vec![raw("tab_switch")])
        .await
        .unwrap_err();
    assert!(matches!(late, ServiceError::Conflict(_)));

    // the stored result is untouched
    let stored = service.find(id).await.unwrap();
    assert_eq!(stored.percentage, 80);
    assert!(stored.violations.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submits_grade_once() {
    let service = Arc::new(service());
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { submit(&service, id).await })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let outcomes: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ServiceError::Conflict(_)))
    );
}

#[tokio::test]
async fn test_submit_session_evidence() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let mut session = ProctorSession::open(id, 1, exam_id);
    session.record_raw(raw("tab-switch"));
    session.attach_report(ProctorReport::new(ViolationBreakdown {
        no_face: 3,
        ..Default::default()
    }));

    let s = service
        .submit_session(session.close(), answers())
        .await
        .unwrap()
        .submission;

    // tab switch 5, AI no-face 3 x 1
    assert_eq!(s.violation_penalty, 8.0);
    assert_eq!(s.score, 72.0);
    assert_eq!(s.percentage, 72);
    assert_eq!(s.status, SubmissionStatus::Submitted);
    assert_eq!(s.violations[0].kind, ViolationKind::TabSwitch);
    assert_eq!(s.penalty_breakdown[1].kind, "AI_NO_FACE");
    assert!(s.proctor_report.is_some());
}

#[tokio::test]
async fn test_skipped_answers_are_reported() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let graded = service
        .submit(SubmitAnswers {
            submission_id: id,
            answers: vec![
                AnswerInput::new(1, SOLUTION, "ok, passed"),
                AnswerInput::new(9, SOLUTION, "passed"),
            ],
            proctor_report: None,
        })
        .await
        .unwrap();

    assert_eq!(graded.issues.len(), 1);
    assert!(matches!(graded.issues[0], GraderError::Validation(_)));
    assert_eq!(graded.submission.answers.len(), 1);
}

#[tokio::test]
async fn test_missing_exam_and_submission() {
    let service = service();
    let err = service
        .start_attempt(StartAttempt {
            student_id: 1,
            exam_id: 42,
        })
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::ExamNotFound(42));

    let err = submit(&service, 7).await.unwrap_err();
    assert_eq!(err, ServiceError::SubmissionNotFound(7));
}

#[tokio::test]
async fn test_review_lifecycle() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let err = service.review(id, "ta@example.com").await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::Grader(GraderError::InvalidTransition {
            from: SubmissionStatus::InProgress,
            to: SubmissionStatus::Reviewed,
        })
    );

    service
        .record_violations(id, vec![raw("MULTIPLE_FACES")])
        .await
        .unwrap();
    submit(&service, id).await.unwrap();
    let reviewed = service.review(id, "ta@example.com").await.unwrap();
    assert_eq!(reviewed.status, SubmissionStatus::Reviewed);
    assert_eq!(reviewed.reviewed_by.as_deref(), Some("ta@example.com"));
}

#[tokio::test]
async fn test_policy_comes_from_config() {
    let config = Config {
        flag_penalty_threshold: 4.0,
        ..Config::default()
    };
    let service = SubmissionService::from_config(
        Arc::new(InMemorySubmissionRepository::new()),
        &config,
    );
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;
    service
        .record_violations(id, vec![raw("tab_switch")])
        .await
        .unwrap();

    let s = submit(&service, id).await.unwrap().submission;
    assert_eq!(s.violation_penalty, 5.0);
    assert_eq!(s.status, SubmissionStatus::Flagged);
}

#[tokio::test]
async fn test_evaluation_needs_labels_then_reports() {
    let service = service();
    let exam_id = seed_exam(&service).await;

    let outcome = service.evaluate().await.unwrap();
    assert!(outcome.is_insufficient());

    for student in 0..10 {
        let id = start(&service, exam_id, student).await;
        let cheating = student < 6;
        if cheating {
            service
                .record_violations(id, vec![raw("copy")])
                .await
                .unwrap();
        }
        submit(&service, id).await.unwrap();
        service
            .label(LabelSubmission {
                submission_id: id,
                label: if cheating { Label::Cheating } else { Label::Genuine },
                cheating_type: cheating.then(|| "copy_paste".to_string()),
                labeled_by: "reviewer".into(),
            })
            .await
            .unwrap();
    }

    let outcome = service.evaluate().await.unwrap();
    let EvaluationOutcome::Report(report) = outcome else {
        panic!("expected a report");
    };
    assert_eq!(report.total_labeled, 10);
    assert_eq!(report.confusion_matrix.tp, 6);
    assert_eq!(report.confusion_matrix.tn, 4);
    assert_eq!(report.metrics.accuracy, 100.0);
    assert_eq!(report.metrics.precision, 100.0);
    assert_eq!(report.metrics.recall, 100.0);
    assert_eq!(report.metrics.f1_score, 100.0);
}

#[tokio::test]
async fn test_relabel_overwrites() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let label = |label, cheating_type: Option<&str>| LabelSubmission {
        submission_id: id,
        label,
        cheating_type: cheating_type.map(str::to_string),
        labeled_by: "reviewer".into(),
    };
    service
        .label(label(Label::Cheating, Some("impersonation")))
        .await
        .unwrap();
    let s = service
        .label(label(Label::Genuine, Some("ignored")))
        .await
        .unwrap();
    assert_eq!(s.label, Label::Genuine);
    assert_eq!(s.cheating_type, None);
}

/// Records a violation on `target` each time grading looks up the exam, as a
/// detector reporting mid-submit would, until `remaining` runs out.
struct RacingRepository {
    inner: InMemorySubmissionRepository,
    target: i64,
    kind: &'static str,
    remaining: AtomicUsize,
}

#[async_trait]
impl SubmissionRepository for RacingRepository {
    async fn create_exam(&self, title: String, questions: Vec<Question>) -> ServiceResult<Exam> {
        self.inner.create_exam(title, questions).await
    }

    async fn find_exam(&self, id: i64) -> ServiceResult<Option<Exam>> {
        let exam = self.inner.find_exam(id).await?;
        let pending = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            self.inner
                .append_violations(self.target, vec![Violation::from_raw(raw(self.kind))])
                .await?;
        }
        Ok(exam)
    }

    async fn create_submission(&self, student_id: i64, exam_id: i64) -> ServiceResult<Submission> {
        self.inner.create_submission(student_id, exam_id).await
    }

    async fn find(&self, id: i64) -> ServiceResult<Option<Submission>> {
        self.inner.find(id).await
    }

    async fn list(&self) -> ServiceResult<Vec<Submission>> {
        self.inner.list().await
    }

    async fn append_violations(
        &self,
        id: i64,
        violations: Vec<Violation>,
    ) -> ServiceResult<Submission> {
        self.inner.append_violations(id, violations).await
    }

    async fn finalize(
        &self,
        id: i64,
        graded_violations: usize,
        report: GradingReport,
        proctor_report: Option<ProctorReport>,
    ) -> ServiceResult<Submission> {
        self.inner
            .finalize(id, graded_violations, report, proctor_report)
            .await
    }

    async fn mark_reviewed(&self, id: i64, reviewer: String) -> ServiceResult<Submission> {
        self.inner.mark_reviewed(id, reviewer).await
    }

    async fn save_label(&self, id: i64, update: LabelUpdate) -> ServiceResult<Submission> {
        self.inner.save_label(id, update).await
    }
}

async fn racing_service(
    kind: &'static str,
    remaining: usize,
) -> (SubmissionService<RacingRepository>, i64) {
    let inner = InMemorySubmissionRepository::new();
    let exam = inner
        .create_exam("Final".into(), vec![Question::new(1, 80.0), Question::new(2, 20.0)])
        .await
        .unwrap();
    let submission = inner.create_submission(1, exam.id).await.unwrap();
    let repo = RacingRepository {
        inner,
        target: submission.id,
        kind,
        remaining: AtomicUsize::new(remaining),
    };
    (SubmissionService::new(Arc::new(repo)), submission.id)
}

#[tokio::test]
async fn test_violation_recorded_during_submit_is_charged() {
    let (service, id) = racing_service("MULTIPLE_PERSONS", 1).await;

    let s = service
        .submit(SubmitAnswers {
            submission_id: id,
            answers: answers(),
            proctor_report: None,
        })
        .await
        .unwrap()
        .submission;

    assert_eq!(s.violations.len(), 1);
    assert_eq!(s.penalty_breakdown.len(), 1);
    assert_eq!(s.penalty_breakdown[0].kind, "MULTIPLE_PERSONS");
    assert_eq!(s.violation_penalty, 20.0);
    assert_eq!(s.score, 60.0);
    assert_eq!(s.status, SubmissionStatus::Flagged);
}

#[tokio::test]
async fn test_submit_gives_up_while_evidence_keeps_arriving() {
    let (service, id) = racing_service("tab_switch", usize::MAX).await;

    let err = service
        .submit(SubmitAnswers {
            submission_id: id,
            answers: answers(),
            proctor_report: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::StaleEvidence(id));

    let stored = service.find(id).await.unwrap();
    assert_eq!(stored.status, SubmissionStatus::InProgress);
    assert_eq!(stored.violations.len(), MAX_GRADING_ATTEMPTS as usize);
}

#[tokio::test]
async fn test_clean_report_serializes_positive_zero_penalty() {
    let service = service();
    let exam_id = seed_exam(&service).await;
    let id = start(&service, exam_id, 1).await;

    let s = submit(&service, id).await.unwrap().submission;
    let json = serde_json::to_value(&s).unwrap();
    assert_eq!(json["violationPenalty"].to_string(), "0.0");
    assert_eq!(json["penaltyBreakdown"], serde_json::json!([]));
}
