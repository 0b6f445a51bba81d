//! # Violation Classifier
//!
//! Maps violation type names from every producer (lowercase browser events,
//! uppercase AI detector events) onto one canonical [`ViolationKind`], and
//! groups a submission's violations by kind for the penalty calculator.
//!
//! Nothing is ever rejected here. A name the taxonomy does not know becomes
//! [`ViolationKind::Other`] and is later charged with the default penalty rule.

use crate::types::Violation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical violation taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ViolationKind {
    TabSwitch,
    WindowBlur,
    FullscreenExit,
    CopyPaste,
    RightClick,
    DevToolsOpen,
    NoFace,
    MultiplePersons,
    LookingAway,
    GhostTyping,
    /// Anything unrecognised, keyed by its normalized name.
    Other(String),
}

impl ViolationKind {
    /// Normalizes a raw type name.
    ///
    /// Trims, upper-cases and turns `-` and spaces into `_` before alias lookup,
    /// so `"tab-switch"`, `"tab_switch"` and `"TAB_SWITCH"` all agree.
    pub fn normalize(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match key.as_str() {
            "TAB_SWITCH" | "TAB_CHANGE" | "VISIBILITY_CHANGE" => Self::TabSwitch,
            "WINDOW_BLUR" | "BLUR" | "FOCUS_LOST" => Self::WindowBlur,
            "FULLSCREEN_EXIT" | "EXIT_FULLSCREEN" => Self::FullscreenExit,
            "COPY_PASTE" | "COPY" | "PASTE" | "CUT" => Self::CopyPaste,
            "RIGHT_CLICK" | "CONTEXT_MENU" => Self::RightClick,
            "DEVTOOLS" | "DEVTOOLS_OPEN" => Self::DevToolsOpen,
            "NO_FACE" | "NO_FACE_DETECTED" => Self::NoFace,
            "MULTIPLE_PERSONS" | "MULTIPLE_FACES" => Self::MultiplePersons,
            "LOOKING_AWAY" | "GAZE_AWAY" => Self::LookingAway,
            "GHOST_TYPING" | "GHOST_TYPING_DETECTED" => Self::GhostTyping,
            _ => Self::Other(key),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TabSwitch => "TAB_SWITCH",
            Self::WindowBlur => "WINDOW_BLUR",
            Self::FullscreenExit => "FULLSCREEN_EXIT",
            Self::CopyPaste => "COPY_PASTE",
            Self::RightClick => "RIGHT_CLICK",
            Self::DevToolsOpen => "DEVTOOLS_OPEN",
            Self::NoFace => "NO_FACE_DETECTED",
            Self::MultiplePersons => "MULTIPLE_PERSONS",
            Self::LookingAway => "LOOKING_AWAY",
            Self::GhostTyping => "GHOST_TYPING_DETECTED",
            Self::Other(name) => name,
        }
    }

    /// Kinds that flag a submission on their own, whatever the penalty total.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::GhostTyping | Self::MultiplePersons)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ViolationKind {
    fn from(raw: String) -> Self {
        ViolationKind::normalize(&raw)
    }
}

impl From<&str> for ViolationKind {
    fn from(raw: &str) -> Self {
        ViolationKind::normalize(raw)
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// All violations of one kind, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationGroup<'a> {
    pub kind: ViolationKind,
    pub occurrences: Vec<&'a Violation>,
}

impl ViolationGroup<'_> {
    pub fn count(&self) -> usize {
        self.occurrences.len()
    }
}

/// Groups violations by kind.
///
/// Groups appear in the order their kind was first seen; occurrences keep
/// their arrival order. An empty slice yields no groups.
pub fn classify(violations: &[Violation]) -> Vec<ViolationGroup<'_>> {
    let mut groups: Vec<ViolationGroup<'_>> = Vec::new();

    for violation in violations {
        match groups.iter_mut().find(|g| g.kind == violation.kind) {
            Some(group) => group.occurrences.push(violation),
            None => groups.push(ViolationGroup {
                kind: violation.kind.clone(),
                occurrences: vec![violation],
            }),
        }
    }

    groups
}
