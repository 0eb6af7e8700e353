//! Qualification between tournaments.
//!
//! Rules map ranges of final positions to a destination tournament. Applying
//! them flags the selected rankings as qualified or relegated and hands the
//! teams on to the destination.

pub mod engine;
pub mod models;

pub use engine::{QualificationEngine, apply_flags, cap_outcomes};
pub use models::{
    QualificationOutcome, QualificationReport, QualificationRule, QualificationRuleDraft,
    QualificationRuleId, QualificationType,
};
