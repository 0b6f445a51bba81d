//!
//! Traits Module
//!
//! Seams where the grading engine can be extended.
//!
//! - [`answer_grader`]: strategy for awarding points to a single answer.

pub mod answer_grader;
