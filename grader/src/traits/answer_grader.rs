use crate::types::{Answer, AnswerInput, Question};

/// AnswerGrader is a strategy trait for grading one answer against its question.
///
/// The default strategy is [`HeuristicGrader`](crate::graders::heuristic::HeuristicGrader).
/// An implementation backed by real test-case execution can replace it through
/// [`GradingJob::with_grader`](crate::GradingJob::with_grader).
pub trait AnswerGrader: Send + Sync {
    /// Grade `answer`, producing a finished [`Answer`].
    ///
    /// - `question`: the matching question; its `points` bound `points_possible`.
    /// - `answer`: the submitted code and captured output.
    fn grade(&self, question: &Question, answer: &AnswerInput) -> Answer;
}
