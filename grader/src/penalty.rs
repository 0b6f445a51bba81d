//! # Penalty Calculator
//!
//! Turns grouped violations and an optional AI-proctor summary into a total
//! penalty and an itemized breakdown.
//!
//! ## Per-type schedule
//!
//! Every kind has a [`PenaltyRule`] `{first, increment, max}`. The first
//! occurrence costs `first`. Occurrence `i` (0-indexed, `i >= 1`) costs
//! `max(0.5, increment - floor(i / 3))`, so bursts of repeated triggers get
//! cheaper while sustained misconduct keeps costing something. The running
//! total is clamped to `max` and `maxReached` is set once the cap is touched.
//!
//! ## AI entries
//!
//! Counts from the proctor summary are charged separately as `AI_*` rows,
//! `min(count * rate, cap)`, so client-side and detector-side evidence stay
//! auditable on their own.
//!
//! The total is the sum of all rows rounded to one decimal place.

use crate::classifier::{ViolationGroup, ViolationKind, classify};
use crate::types::{PenaltyBreakdownEntry, ProctorReport, Violation};
use tracing::debug;

/// Cost schedule for one violation kind, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyRule {
    pub first: f64,
    pub increment: f64,
    pub max: f64,
}

impl PenaltyRule {
    pub const fn new(first: f64, increment: f64, max: f64) -> Self {
        Self {
            first,
            increment,
            max,
        }
    }

    /// Rule applied to any kind without its own entry.
    pub const DEFAULT: PenaltyRule = PenaltyRule::new(2.0, 1.0, 10.0);

    pub fn for_kind(kind: &ViolationKind) -> Self {
        match kind {
            ViolationKind::GhostTyping => Self::new(15.0, 5.0, 40.0),
            ViolationKind::MultiplePersons => Self::new(20.0, 10.0, 45.0),
            ViolationKind::DevToolsOpen => Self::new(10.0, 5.0, 30.0),
            ViolationKind::TabSwitch => Self::new(5.0, 3.0, 25.0),
            ViolationKind::FullscreenExit => Self::new(5.0, 3.0, 20.0),
            ViolationKind::CopyPaste => Self::new(5.0, 3.0, 20.0),
            ViolationKind::WindowBlur => Self::new(3.0, 2.0, 15.0),
            ViolationKind::NoFace => Self::new(2.0, 1.0, 10.0),
            ViolationKind::LookingAway => Self::new(2.0, 1.0, 10.0),
            ViolationKind::RightClick => Self::new(1.0, 1.0, 5.0),
            ViolationKind::Other(_) => Self::DEFAULT,
        }
    }

    /// Cost of occurrence `index` (0-indexed) taken on its own.
    pub fn occurrence_cost(&self, index: usize) -> f64 {
        if index == 0 {
            self.first
        } else {
            (self.increment - (index / 3) as f64).max(0.5)
        }
    }

    /// Capped penalty for `count` occurrences, and whether the cap was reached.
    pub fn apply(&self, count: usize) -> (f64, bool) {
        let mut running = 0.0;
        for index in 0..count {
            running += self.occurrence_cost(index);
            if running >= self.max {
                return (self.max, true);
            }
        }
        (running, false)
    }
}

/// Synthetic rate for one AI-proctor category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiRate {
    pub label: &'static str,
    pub per_occurrence: f64,
    pub cap: f64,
    pub critical: bool,
}

pub const AI_GHOST_TYPING: AiRate = AiRate {
    label: "AI_GHOST_TYPING",
    per_occurrence: 15.0,
    cap: 40.0,
    critical: true,
};

pub const AI_MULTIPLE_PERSONS: AiRate = AiRate {
    label: "AI_MULTIPLE_PERSONS",
    per_occurrence: 20.0,
    cap: 45.0,
    critical: true,
};

pub const AI_NO_FACE: AiRate = AiRate {
    label: "AI_NO_FACE",
    per_occurrence: 1.0,
    cap: 10.0,
    critical: false,
};

impl AiRate {
    fn entry(&self, count: u32) -> PenaltyBreakdownEntry {
        let raw = f64::from(count) * self.per_occurrence;
        PenaltyBreakdownEntry {
            kind: self.label.to_string(),
            count: count as usize,
            penalty: round1(raw.min(self.cap)),
            max_reached: raw >= self.cap,
        }
    }
}

/// Result of one penalty pass. Always a fresh, owned value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PenaltyAssessment {
    pub total: f64,
    pub breakdown: Vec<PenaltyBreakdownEntry>,
    /// A ghost-typing or multiple-persons row is present, client- or AI-detected.
    pub critical_detected: bool,
}

/// Negative zero (an empty `sum()`) comes back as `0.0`.
#[inline]
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0 + 0.0
}

/// Charges already-grouped violations.
pub fn assess_groups(
    groups: &[ViolationGroup<'_>],
    report: Option<&ProctorReport>,
) -> PenaltyAssessment {
    let mut breakdown = Vec::with_capacity(groups.len() + 3);
    let mut critical_detected = false;

    for group in groups {
        let rule = PenaltyRule::for_kind(&group.kind);
        let (penalty, max_reached) = rule.apply(group.count());
        debug!(
            kind = %group.kind,
            count = group.count(),
            penalty,
            max_reached,
            "charged violation group"
        );
        critical_detected |= group.kind.is_critical();
        breakdown.push(PenaltyBreakdownEntry {
            kind: group.kind.to_string(),
            count: group.count(),
            penalty: round1(penalty),
            max_reached,
        });
    }

    if let Some(report) = report {
        let counts = report.violation_breakdown;
        for (rate, count) in [
            (AI_GHOST_TYPING, counts.ghost_typing),
            (AI_MULTIPLE_PERSONS, counts.multiple_persons),
            (AI_NO_FACE, counts.no_face),
        ] {
            if count == 0 {
                continue;
            }
            critical_detected |= rate.critical;
            breakdown.push(rate.entry(count));
        }
    }

    let total = round1(breakdown.iter().map(|e| e.penalty).sum());

    PenaltyAssessment {
        total,
        breakdown,
        critical_detected,
    }
}

/// Classifies and charges a raw violation list in one step.
pub fn assess(violations: &[Violation], report: Option<&ProctorReport>) -> PenaltyAssessment {
    assess_groups(&classify(violations), report)
}
