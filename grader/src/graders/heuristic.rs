//! # HeuristicGrader Strategy
//!
//! Approximate per-question grading used while exact test-case verification is
//! delegated to the external execution sandbox. It looks only at how much code
//! the student added and at markers in the captured output. Treat its result as
//! a provisional mark, not an authoritative one.
//!
//! ## Rules
//!
//! 1. Code must exceed the starter code by at least `min_code_growth` characters
//!    (both trimmed), otherwise the answer earns nothing.
//! 2. Output containing a success marker earns full points and counts as correct.
//! 3. Output containing an error marker and no success marker earns nothing.
//! 4. Any other non-empty output earns `partial_credit` of the points.
//! 5. Empty output earns nothing.

use crate::traits::answer_grader::AnswerGrader;
use crate::types::{Answer, AnswerInput, Question};
use once_cell::sync::Lazy;
use regex::Regex;

static SUCCESS_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\bpassed\b|\bsuccess|✓)").expect("success marker pattern is valid")
});

static ERROR_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\berror|exception|traceback|\bfailed\b|panicked)")
        .expect("error marker pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicGrader {
    pub min_code_growth: usize,
    pub partial_credit: f64,
}

impl Default for HeuristicGrader {
    fn default() -> Self {
        Self {
            min_code_growth: 20,
            partial_credit: 0.5,
        }
    }
}

impl HeuristicGrader {
    /// `partial_credit` is clamped into `[0, 1]`.
    pub fn new(min_code_growth: usize, partial_credit: f64) -> Self {
        let partial_credit = if partial_credit.is_finite() {
            partial_credit.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            min_code_growth,
            partial_credit,
        }
    }

    pub fn from_config(config: &common::config::Config) -> Self {
        Self::new(config.min_code_growth, config.partial_credit)
    }

    fn code_growth(question: &Question, answer: &AnswerInput) -> usize {
        let written = answer.code.trim().chars().count();
        let starter = question.starter_code.trim().chars().count();
        written.saturating_sub(starter)
    }
}

impl AnswerGrader for HeuristicGrader {
    fn grade(&self, question: &Question, answer: &AnswerInput) -> Answer {
        let points = question.points;
        let output = answer.output.trim();

        let (is_correct, earned) = if Self::code_growth(question, answer) < self.min_code_growth {
            (false, 0.0)
        } else if SUCCESS_MARKER.is_match(output) {
            (true, points)
        } else if ERROR_MARKER.is_match(output) || output.is_empty() {
            (false, 0.0)
        } else {
            (false, points * self.partial_credit)
        };

        Answer {
            question_number: answer.question_number,
            code: answer.code.clone(),
            output: answer.output.clone(),
            is_correct,
            points_earned: earned,
            points_possible: points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTER: &str = "def solve(xs):\n    pass";
    const WRITTEN: &str = "def solve(xs):\n    return sorted(set(xs), reverse=True)[:3]";

    fn question() -> Question {
        Question::new(1, 10.0).with_starter_code(STARTER)
    }

    fn grade(code: &str, output: &str) -> Answer {
        HeuristicGrader::default().grade(&question(), &AnswerInput::new(1, code, output))
    }

    #[test]
    fn test_untouched_starter_code_earns_nothing() {
        let a = grade(STARTER, "All tests passed");
        assert_eq!(a.points_earned, 0.0);
        assert!(!a.is_correct);
        assert_eq!(a.points_possible, 10.0);
    }

    #[test]
    fn test_success_marker_earns_full_credit() {
        let a = grade(WRITTEN, "3/3 tests PASSED");
        assert_eq!(a.points_earned, 10.0);
        assert!(a.is_correct);

        let a = grade(WRITTEN, "✓ sample case");
        assert!(a.is_correct);
    }

    #[test]
    fn test_success_beats_error_marker() {
        let a = grade(WRITTEN, "Error in case 2 was retried; all tests passed");
        assert!(a.is_correct);
    }

    #[test]
    fn test_error_marker_earns_zero() {
        let a = grade(WRITTEN, "Traceback (most recent call last): ...");
        assert_eq!(a.points_earned, 0.0);
        let a = grade(WRITTEN, "thread 'main' panicked at src/main.rs");
        assert_eq!(a.points_earned, 0.0);
    }

    #[test]
    fn test_other_output_earns_partial_credit() {
        let a = grade(WRITTEN, "[9, 7, 5]");
        assert_eq!(a.points_earned, 5.0);
        assert!(!a.is_correct);
    }

    #[test]
    fn test_empty_output_earns_zero() {
        let a = grade(WRITTEN, "   \n");
        assert_eq!(a.points_earned, 0.0);
    }

    #[test]
    fn test_unsuccessful_is_not_a_success_marker() {
        let a = grade(WRITTEN, "unsuccessful attempt");
        assert_eq!(a.points_earned, 5.0);
    }

    #[test]
    fn test_partial_credit_is_clamped() {
        let g = HeuristicGrader::new(0, 4.0);
        assert_eq!(g.partial_credit, 1.0);
        let g = HeuristicGrader::new(0, f64::NAN);
        assert_eq!(g.partial_credit, 0.0);
    }
}
