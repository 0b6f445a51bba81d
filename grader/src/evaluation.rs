//! # Evaluation Engine
//!
//! Measures how well the engine's verdicts agree with human ground truth.
//!
//! Every labeled submission (`genuine` or `cheating`; `unlabeled` is ignored)
//! gets a system prediction: **cheating** when it carries at least one
//! violation, a non-zero penalty, or the `flagged` status. Comparing that
//! prediction with the label gives one confusion-matrix cell per submission,
//! from which the usual detection metrics are derived.
//!
//! Rates are reported as percentages rounded to two decimals. Every ratio
//! with a zero denominator is reported as `0`. When fewer labeled submissions
//! exist than the configured minimum, an [`InsufficientData`] outcome is
//! returned instead of a page of misleading zeros.

use crate::scorer::round2;
use crate::submission::{Label, Submission, SubmissionStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default minimum number of labeled submissions for a metrics report.
pub const DEFAULT_MIN_LABELED: usize = 10;

/// Where one submission lands in the confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "TP")]
    TruePositive,
    #[serde(rename = "TN")]
    TrueNegative,
    #[serde(rename = "FP")]
    FalsePositive,
    #[serde(rename = "FN")]
    FalseNegative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    #[serde(rename = "TP")]
    pub tp: usize,
    #[serde(rename = "TN")]
    pub tn: usize,
    #[serde(rename = "FP")]
    pub fp: usize,
    #[serde(rename = "FN")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, classification: Classification) {
        match classification {
            Classification::TruePositive => self.tp += 1,
            Classification::TrueNegative => self.tn += 1,
            Classification::FalsePositive => self.fp += 1,
            Classification::FalseNegative => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1_score: f64,
    /// False-positive rate.
    pub fpr: f64,
    /// False-negative rate.
    pub fnr: f64,
    /// Matthews correlation coefficient in `[-1, 1]`, four decimals.
    pub mcc: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassBreakdown {
    pub genuine_sessions: usize,
    pub cheating_sessions: usize,
    pub correctly_classified: usize,
    pub incorrectly_classified: usize,
}

/// Per-submission row, for auditing individual verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClassification {
    pub submission_id: i64,
    pub student_id: i64,
    pub label: Label,
    pub prediction: Label,
    pub classification: Classification,
    pub violation_count: usize,
    pub violation_penalty: f64,
    pub status: SubmissionStatus,
    pub cheating_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub total_labeled: usize,
    pub confusion_matrix: ConfusionMatrix,
    pub metrics: EvaluationMetrics,
    pub breakdown: ClassBreakdown,
    pub sessions: Vec<SessionClassification>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsufficientData {
    pub message: String,
    pub total_labeled: usize,
    pub labeled_count: usize,
    pub required_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvaluationOutcome {
    Report(EvaluationReport),
    InsufficientData(InsufficientData),
}

impl EvaluationOutcome {
    pub fn report(&self) -> Option<&EvaluationReport> {
        match self {
            EvaluationOutcome::Report(report) => Some(report),
            EvaluationOutcome::InsufficientData(_) => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, EvaluationOutcome::InsufficientData(_))
    }
}

/// The engine's own verdict for a submission.
pub fn predicts_cheating(submission: &Submission) -> bool {
    !submission.violations.is_empty()
        || submission.violation_penalty > 0.0
        || submission.status == SubmissionStatus::Flagged
}

/// Confusion-matrix cell for a labeled submission; `None` when unlabeled.
pub fn classify_submission(submission: &Submission) -> Option<Classification> {
    let predicted = predicts_cheating(submission);
    match (submission.label, predicted) {
        (Label::Unlabeled, _) => None,
        (Label::Cheating, true) => Some(Classification::TruePositive),
        (Label::Genuine, false) => Some(Classification::TrueNegative),
        (Label::Genuine, true) => Some(Classification::FalsePositive),
        (Label::Cheating, false) => Some(Classification::FalseNegative),
    }
}

fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}

/// Derives every metric from the raw counts.
pub fn compute_metrics(cm: &ConfusionMatrix) -> EvaluationMetrics {
    let precision = rate(cm.tp, cm.tp + cm.fp);
    let recall = rate(cm.tp, cm.tp + cm.fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    let (tp, tn, fp, fn_) = (cm.tp as f64, cm.tn as f64, cm.fp as f64, cm.fn_ as f64);
    let mcc_den = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    let mcc = if mcc_den > 0.0 {
        (tp * tn - fp * fn_) / mcc_den
    } else {
        0.0
    };

    EvaluationMetrics {
        accuracy: round2(rate(cm.tp + cm.tn, cm.total())),
        precision: round2(precision),
        recall: round2(recall),
        specificity: round2(rate(cm.tn, cm.tn + cm.fp)),
        f1_score: round2(f1),
        fpr: round2(rate(cm.fp, cm.fp + cm.tn)),
        fnr: round2(rate(cm.fn_, cm.fn_ + cm.tp)),
        mcc: (mcc * 10_000.0).round() / 10_000.0 + 0.0,
    }
}

/// Evaluates the engine against every labeled submission in `submissions`.
pub fn evaluate<'a, I>(submissions: I, min_labeled: usize) -> EvaluationOutcome
where
    I: IntoIterator<Item = &'a Submission>,
{
    let mut cm = ConfusionMatrix::default();
    let mut sessions = Vec::new();

    for submission in submissions {
        let Some(classification) = classify_submission(submission) else {
            continue;
        };
        cm.record(classification);
        sessions.push(SessionClassification {
            submission_id: submission.id,
            student_id: submission.student_id,
            label: submission.label,
            prediction: if predicts_cheating(submission) {
                Label::Cheating
            } else {
                Label::Genuine
            },
            classification,
            violation_count: submission.violations.len(),
            violation_penalty: submission.violation_penalty,
            status: submission.status,
            cheating_type: submission.cheating_type.clone(),
        });
    }

    let labeled = cm.total();
    if labeled == 0 || labeled < min_labeled {
        debug!(labeled, min_labeled, "not enough labeled submissions to evaluate");
        return EvaluationOutcome::InsufficientData(InsufficientData {
            message: "insufficient data".to_string(),
            total_labeled: labeled,
            labeled_count: labeled,
            required_count: min_labeled,
        });
    }

    let metrics = compute_metrics(&cm);
    info!(
        labeled,
        tp = cm.tp,
        tn = cm.tn,
        fp = cm.fp,
        fn_ = cm.fn_,
        accuracy = metrics.accuracy,
        "evaluation complete"
    );

    EvaluationOutcome::Report(EvaluationReport {
        total_labeled: labeled,
        confusion_matrix: cm,
        metrics,
        breakdown: ClassBreakdown {
            genuine_sessions: cm.tn + cm.fp,
            cheating_sessions: cm.tp + cm.fn_,
            correctly_classified: cm.tp + cm.tn,
            incorrectly_classified: cm.fp + cm.fn_,
        },
        sessions,
    })
}
