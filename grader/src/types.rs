//! # Types Module
//!
//! Plain data shapes shared by every stage of the engine: recorded violations,
//! the AI-proctor summary, exam questions, submitted and graded answers, and
//! penalty breakdown rows. All of them serialize with camelCase field names.

use crate::classifier::ViolationKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Severity attached to a violation by the client or the AI detector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A violation record as it arrives from any historical producer.
///
/// Legacy browser events use lowercase names and sometimes `details` instead of
/// `description`; AI events use uppercase names and carry a confidence. Nothing
/// here is validated; [`Violation::from_raw`](crate::types::Violation::from_raw)
/// is the normalization boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawViolation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, alias = "details")]
    pub description: Option<String>,
}

/// One observed rule breach, normalized into the canonical taxonomy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Violation {
    pub fn new(kind: ViolationKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            severity: None,
            confidence: None,
            description: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Confidence is clamped into `[0, 1]`; non-finite values are dropped.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.is_finite().then(|| confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Normalizes a loosely-typed record.
    ///
    /// Never fails: unknown type names land in [`ViolationKind::Other`], an
    /// unparseable severity becomes `None`, and a missing timestamp is stamped now.
    pub fn from_raw(raw: RawViolation) -> Self {
        let mut violation = Violation::new(
            ViolationKind::normalize(&raw.kind),
            raw.timestamp.unwrap_or_else(Utc::now),
        );
        violation.severity = raw.severity.as_deref().and_then(|s| s.trim().parse().ok());
        if let Some(confidence) = raw.confidence {
            violation = violation.with_confidence(confidence);
        }
        violation.description = raw.description;
        violation
    }
}

impl From<RawViolation> for Violation {
    fn from(raw: RawViolation) -> Self {
        Violation::from_raw(raw)
    }
}

/// Coarse session risk bucket reported by the AI proctor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum RiskLevel {
    LowRisk,
    MediumRisk,
    HighRisk,
}

/// Per-category counts from the AI detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViolationBreakdown {
    pub ghost_typing: u32,
    pub multiple_persons: u32,
    pub no_face: u32,
}

impl ViolationBreakdown {
    pub fn is_empty(&self) -> bool {
        self.ghost_typing == 0 && self.multiple_persons == 0 && self.no_face == 0
    }
}

/// AI-proctor summary for one exam session. Read-only input to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctorReport {
    #[serde(default)]
    pub violation_breakdown: ViolationBreakdown,
    #[serde(default, deserialize_with = "deserialize_risk_level")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub frames_processed: u64,
    /// Session length in seconds.
    #[serde(default)]
    pub duration: f64,
}

/// Unknown risk strings deserialize as `None`; [`ProctorReport::risk_level`] then re-assesses.
fn deserialize_risk_level<'de, D>(deserializer: D) -> Result<Option<RiskLevel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

impl ProctorReport {
    pub fn new(violation_breakdown: ViolationBreakdown) -> Self {
        Self {
            violation_breakdown,
            risk_level: None,
            frames_processed: 0,
            duration: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violation_breakdown.is_empty()
    }

    /// Risk derived from the counts alone, used when the detector's own label is missing.
    pub fn assess_risk(breakdown: &ViolationBreakdown) -> RiskLevel {
        if breakdown.ghost_typing >= 3 || breakdown.multiple_persons >= 2 {
            RiskLevel::HighRisk
        } else if breakdown.ghost_typing >= 1 || breakdown.no_face > 20 {
            RiskLevel::MediumRisk
        } else {
            RiskLevel::LowRisk
        }
    }

    /// The reported risk level, clamped into the closed set.
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
            .unwrap_or_else(|| Self::assess_risk(&self.violation_breakdown))
    }
}

/// One exam question as far as scoring is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[validate(range(min = 1, message = "questionNumber must be at least 1"))]
    pub question_number: i64,
    #[validate(range(min = 0.0, message = "points must not be negative"))]
    pub points: f64,
    #[serde(default)]
    pub starter_code: String,
}

impl Question {
    pub fn new(question_number: i64, points: f64) -> Self {
        Self {
            question_number,
            points,
            starter_code: String::new(),
        }
    }

    pub fn with_starter_code(mut self, starter_code: impl Into<String>) -> Self {
        self.starter_code = starter_code.into();
        self
    }
}

/// An exam as far as scoring is concerned: an ordered list of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub questions: Vec<Question>,
}

/// A student's response to one question, before grading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerInput {
    #[validate(range(min = 1, message = "questionNumber must be at least 1"))]
    pub question_number: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub output: String,
}

impl AnswerInput {
    pub fn new(question_number: i64, code: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            question_number,
            code: code.into(),
            output: output.into(),
        }
    }
}

/// A graded answer. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_number: i64,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub output: String,
    pub is_correct: bool,
    pub points_earned: f64,
    pub points_possible: f64,
}

/// Points deducted for one violation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyBreakdownEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
    pub penalty: f64,
    pub max_reached: bool,
}
