//! # Grader Library
//!
//! Scoring and violation-penalty engine for proctored coding exams. It grades
//! submitted answers, charges penalties for the violations gathered during the
//! attempt, decides the submission's status, and later measures its own verdicts
//! against human labels.
//!
//! ## Key Concepts
//! - **GradingJob**: one grading pass over a single submission's questions, answers and evidence.
//! - **Classifier**: normalizes violation names from every producer into [`classifier::ViolationKind`].
//! - **Penalty**: diminishing, capped per-type penalties plus separately itemized AI-proctor rows.
//! - **AnswerGrader**: pluggable per-answer grading; the default is a documented heuristic.
//! - **Submission**: the aggregate and its at-most-once grading lifecycle.
//! - **Evaluation**: confusion-matrix metrics against ground-truth labels.

pub mod classifier;
pub mod error;
pub mod evaluation;
pub mod graders;
pub mod penalty;
pub mod report;
pub mod scorer;
pub mod session;
pub mod submission;
pub mod traits;
pub mod types;

use crate::error::GraderError;
use crate::graders::heuristic::HeuristicGrader;
use crate::report::{GradingOutcome, GradingReport};
use crate::scorer::{GradingPolicy, compute_percentage, final_score, round2};
use crate::traits::answer_grader::AnswerGrader;
use crate::types::{Answer, AnswerInput, ProctorReport, Question, Violation};

use common::format_validation_errors;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use validator::Validate;

/// A grading pass for a single submission.
///
/// # Fields
/// - `questions`: The exam's questions; their points make up `total_points`.
/// - `answers`: The submitted answers, referencing questions by number.
/// - `violations`: Every violation recorded during the attempt.
/// - `proctor_report`: Optional AI-proctor summary.
/// - `grader`: Strategy that awards points to one answer.
/// - `policy`: Thresholds for the submission status.
pub struct GradingJob<'a> {
    questions: &'a [Question],
    answers: &'a [AnswerInput],
    violations: &'a [Violation],
    proctor_report: Option<&'a ProctorReport>,
    grader: Box<dyn AnswerGrader + 'a>,
    policy: GradingPolicy,
}

impl<'a> GradingJob<'a> {
    /// Create a new grading job with the heuristic grader and default policy.
    ///
    /// # Arguments
    /// * `questions` - The exam's questions.
    /// * `answers` - The student's answers.
    /// * `violations` - The violations recorded for the attempt.
    pub fn new(
        questions: &'a [Question],
        answers: &'a [AnswerInput],
        violations: &'a [Violation],
    ) -> Self {
        Self {
            questions,
            answers,
            violations,
            proctor_report: None,
            grader: Box::new(HeuristicGrader::default()),
            policy: GradingPolicy::default(),
        }
    }

    /// Attach the AI-proctor summary for the session.
    pub fn with_proctor_report(mut self, report: Option<&'a ProctorReport>) -> Self {
        self.proctor_report = report;
        self
    }

    /// Set a custom answer grading strategy.
    ///
    /// # Arguments
    /// * `grader` - An implementation of the `AnswerGrader` trait.
    pub fn with_grader<G: AnswerGrader + 'a>(mut self, grader: G) -> Self {
        self.grader = Box::new(grader);
        self
    }

    /// Set the thresholds used to pick the submission status.
    pub fn with_policy(mut self, policy: GradingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Valid questions keyed by number, plus the issues for the ones that were dropped.
    fn index_questions(&self, issues: &mut Vec<GraderError>) -> HashMap<i64, &'a Question> {
        let mut index = HashMap::with_capacity(self.questions.len());

        for question in self.questions {
            if let Err(errors) = question.validate() {
                issues.push(GraderError::Validation(format!(
                    "Question {}: {}",
                    question.question_number,
                    format_validation_errors(&errors)
                )));
                continue;
            }
            if !question.points.is_finite() {
                issues.push(GraderError::Validation(format!(
                    "Question {}: points must be a finite number",
                    question.question_number
                )));
                continue;
            }
            if index.contains_key(&question.question_number) {
                issues.push(GraderError::Validation(format!(
                    "Question {} is defined more than once",
                    question.question_number
                )));
                continue;
            }
            index.insert(question.question_number, question);
        }

        index
    }

    /// Run the grading pass.
    ///
    /// # Steps
    /// 1. Validates questions; malformed or duplicate ones are skipped.
    /// 2. Recomputes `total_points` from the valid questions.
    /// 3. Grades each answer; malformed, unknown or repeated references are skipped.
    /// 4. Charges penalties for the violations and the proctor summary.
    /// 5. Derives the final score, percentage and status.
    ///
    /// Skipped entries never abort the pass; they are returned as `issues`.
    pub fn grade(self) -> GradingOutcome {
        let mut issues = Vec::new();
        let questions = self.index_questions(&mut issues);

        let total_points = round2(questions.values().map(|q| q.points).sum());

        let mut graded: Vec<Answer> = Vec::with_capacity(self.answers.len());
        let mut seen: HashSet<i64> = HashSet::new();

        for answer in self.answers {
            if let Err(errors) = answer.validate() {
                issues.push(GraderError::Validation(format!(
                    "Answer for question {}: {}",
                    answer.question_number,
                    format_validation_errors(&errors)
                )));
                continue;
            }
            let Some(question) = questions.get(&answer.question_number) else {
                issues.push(GraderError::Validation(format!(
                    "Answer references unknown question {}",
                    answer.question_number
                )));
                continue;
            };
            if !seen.insert(answer.question_number) {
                issues.push(GraderError::Validation(format!(
                    "Question {} was answered more than once",
                    answer.question_number
                )));
                continue;
            }

            let mut result = self.grader.grade(question, answer);
            result.points_earned = round2(result.points_earned);
            debug!(
                question = result.question_number,
                earned = result.points_earned,
                possible = result.points_possible,
                correct = result.is_correct,
                "graded answer"
            );
            graded.push(result);
        }

        for issue in &issues {
            warn!(%issue, "skipped during grading");
        }

        let base_score = round2(graded.iter().map(|a| a.points_earned).sum());
        let assessment = penalty::assess(self.violations, self.proctor_report);
        let score = final_score(base_score, assessment.total);
        let percentage = compute_percentage(score, total_points);
        let status = self.policy.status_for(&assessment);

        GradingOutcome {
            report: GradingReport {
                base_score,
                total_points,
                score,
                percentage,
                violation_penalty: assessment.total,
                penalty_breakdown: assessment.breakdown,
                status,
                answers: graded,
            },
            issues,
        }
    }
}
