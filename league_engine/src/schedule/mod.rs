//! Schedule generation.
//!
//! Round-robin formats get their full fixture list up front. Knockout formats
//! get their first round only; later rounds are drawn with
//! [`ScheduleGenerator::advance_round`] once the previous round is resolved.

pub mod generator;

pub use generator::{
    KnockoutAdvance, MIN_TEAMS, RoundDraft, ScheduleGenerator, round_label, round_state,
    validate_entrants,
};
